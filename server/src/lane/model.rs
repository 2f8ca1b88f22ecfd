use serde_json::{Map, Value};
use thiserror::Error;

use weft_shared::Body;

/// Errors that can occur when a lane applies a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaneError {
    #[error("Lane command must carry a body")]
    MissingBody,

    #[error("Unrecognized lane command: {command}")]
    UnknownCommand { command: String },

    #[error("Map lane keys must be strings, got {key}")]
    InvalidKey { key: String },
}

/// One entry of a lane's state, as replayed to a syncing link
#[derive(Clone, Debug, PartialEq)]
pub struct LaneEntry {
    pub key: Option<Value>,
    pub value: Value,
}

impl LaneEntry {
    pub fn value(value: Value) -> Self {
        Self { key: None, value }
    }

    pub fn keyed(key: Value, value: Value) -> Self {
        Self {
            key: Some(key),
            value,
        }
    }

    /// The body of the `event` that replays this entry. Keyed entries replay
    /// as map updates, unkeyed entries as the bare value.
    pub fn to_body(&self) -> Body {
        match &self.key {
            None => Body::Value(self.value.clone()),
            Some(key) => update_body(key.clone(), self.value.clone()),
        }
    }
}

/// Authoritative state of a lane.
///
/// A model is only ever accessed under its lane's lock, so implementations
/// need no synchronization of their own.
pub trait LaneModel: Send + 'static {
    /// The current state as an ordered sequence of entries
    fn snapshot(&self) -> Vec<LaneEntry>;

    /// Applies a command and returns the bodies of the events it caused
    fn apply(&mut self, command: &Body) -> Result<Vec<Body>, LaneError>;
}

pub(crate) fn update_body(key: Value, value: Value) -> Body {
    let mut update = Map::new();
    update.insert("key".to_string(), key);
    update.insert("value".to_string(), value);
    command_body("update", Value::Object(update))
}

pub(crate) fn command_body(name: &str, args: Value) -> Body {
    let mut command = Map::new();
    command.insert(name.to_string(), args);
    Body::Value(Value::Object(command))
}
