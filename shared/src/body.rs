pub use serde_json::Value;

/// The payload attached to an envelope.
///
/// `Absent` and `Value(Value::Null)` are different things: the former means
/// the envelope carries no body at all, the latter an explicitly empty one.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Body {
    #[default]
    Absent,
    Value(Value),
}

impl Body {
    pub fn empty() -> Self {
        Body::Value(Value::Null)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Body::Absent)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Body::Absent => None,
            Body::Value(value) => Some(value),
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Body::Absent => None,
            Body::Value(value) => Some(value),
        }
    }

    /// Builds a `{"reason": reason}` body, used by `unlinked` and `deauthed`
    /// responses that explain themselves
    pub fn reason(reason: &str) -> Self {
        let mut map = serde_json::Map::new();
        map.insert("reason".to_string(), Value::from(reason));
        Body::Value(Value::Object(map))
    }

    /// Reads back the reason of a body built with [`Body::reason`]
    pub fn reason_str(&self) -> Option<&str> {
        self.value()?.get("reason")?.as_str()
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Value(value)
    }
}

impl From<Option<Value>> for Body {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(value) => Body::Value(value),
            None => Body::Absent,
        }
    }
}
