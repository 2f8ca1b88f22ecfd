use weft_shared::{Body, Value};

use crate::lane::model::{LaneEntry, LaneError, LaneModel};

/// A lane holding a single value. Every command replaces it, and is echoed
/// as an event carrying the new value.
#[derive(Default)]
pub struct ValueLane {
    value: Option<Value>,
}

impl ValueLane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value<V: Into<Value>>(value: V) -> Self {
        Self {
            value: Some(value.into()),
        }
    }

    pub fn get(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

impl LaneModel for ValueLane {
    fn snapshot(&self) -> Vec<LaneEntry> {
        self.value.iter().cloned().map(LaneEntry::value).collect()
    }

    fn apply(&mut self, command: &Body) -> Result<Vec<Body>, LaneError> {
        let value = command.value().ok_or(LaneError::MissingBody)?;
        self.value = Some(value.clone());
        Ok(vec![Body::Value(value.clone())])
    }
}
