use std::collections::BTreeMap;

use weft_shared::{Body, Value};

use crate::lane::model::{command_body, update_body, LaneEntry, LaneError, LaneModel};

/// A lane holding a string-keyed map.
///
/// Commands, and the events they cause, take the forms
/// `{"update":{"key":k,"value":v}}`, `{"remove":{"key":k}}` and
/// `{"clear":{}}`. Commands that change nothing cause no events.
#[derive(Default)]
pub struct MapLane {
    entries: BTreeMap<String, Value>,
}

impl MapLane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LaneModel for MapLane {
    fn snapshot(&self) -> Vec<LaneEntry> {
        self.entries
            .iter()
            .map(|(key, value)| LaneEntry::keyed(Value::from(key.as_str()), value.clone()))
            .collect()
    }

    fn apply(&mut self, command: &Body) -> Result<Vec<Body>, LaneError> {
        let command = command.value().ok_or(LaneError::MissingBody)?;
        let unknown = || LaneError::UnknownCommand {
            command: command.to_string(),
        };
        let Some(map) = command.as_object().filter(|map| map.len() == 1) else {
            return Err(unknown());
        };

        if let Some(update) = map.get("update") {
            let key = key_of(update)?;
            let value = update.get("value").cloned().unwrap_or(Value::Null);
            if self.entries.get(&key) == Some(&value) {
                return Ok(Vec::new());
            }
            self.entries.insert(key.clone(), value.clone());
            return Ok(vec![update_body(Value::from(key), value)]);
        }

        if let Some(remove) = map.get("remove") {
            let key = key_of(remove)?;
            if self.entries.remove(&key).is_none() {
                return Ok(Vec::new());
            }
            let mut args = serde_json::Map::new();
            args.insert("key".to_string(), Value::from(key));
            return Ok(vec![command_body("remove", Value::Object(args))]);
        }

        if map.contains_key("clear") {
            if self.entries.is_empty() {
                return Ok(Vec::new());
            }
            self.entries.clear();
            return Ok(vec![command_body(
                "clear",
                Value::Object(serde_json::Map::new()),
            )]);
        }

        Err(unknown())
    }
}

fn key_of(args: &Value) -> Result<String, LaneError> {
    match args.get("key") {
        Some(Value::String(key)) => Ok(key.clone()),
        Some(other) => Err(LaneError::InvalidKey {
            key: other.to_string(),
        }),
        None => Err(LaneError::InvalidKey {
            key: "null".to_string(),
        }),
    }
}
