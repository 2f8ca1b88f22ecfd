use serde_json::{Map, Value};

use crate::{Body, DecodeError, Envelope, EnvelopeTag, Uri};

const TAG: &str = "tag";
const NODE: &str = "node";
const LANE: &str = "lane";
const PRIO: &str = "prio";
const RATE: &str = "rate";
const BODY: &str = "body";

impl Envelope {
    /// Converts this envelope into its structured wire value
    pub fn to_wire_value(&self) -> Value {
        let tag = self.tag();
        let mut map = Map::new();
        map.insert(TAG.to_string(), Value::from(tag.as_str()));

        if !tag.is_host_addressed() {
            map.insert(NODE.to_string(), Value::from(self.node_uri().as_str()));
            map.insert(LANE.to_string(), Value::from(self.lane_uri().as_str()));
        }

        if tag.carries_hints() {
            // zero is the default, and is left out
            if self.prio() != 0.0 {
                map.insert(PRIO.to_string(), Value::from(self.prio()));
            }
            if self.rate() != 0.0 {
                map.insert(RATE.to_string(), Value::from(self.rate()));
            }
        }

        if let Body::Value(body) = self.body() {
            map.insert(BODY.to_string(), body.clone());
        }

        Value::Object(map)
    }

    /// Reads an envelope from its structured wire value
    pub fn from_wire_value(value: &Value) -> Result<Envelope, DecodeError> {
        let Value::Object(map) = value else {
            return Err(DecodeError::NotAnObject {
                kind: value_kind(value),
            });
        };

        let tag: EnvelopeTag = match map.get(TAG) {
            Some(Value::String(tag)) => tag.parse()?,
            Some(_) | None => return Err(DecodeError::MissingTag),
        };

        let node_uri = uri_field(map, NODE);
        let lane_uri = uri_field(map, LANE);
        let prio = hint_field(map, PRIO);
        let rate = hint_field(map, RATE);
        let body = Body::from(map.get(BODY).cloned());

        Ok(Envelope::from_parts(tag, node_uri, lane_uri, prio, rate, body))
    }
}

fn uri_field(map: &Map<String, Value>, key: &str) -> Uri {
    match map.get(key) {
        Some(Value::String(uri)) => Uri::new(uri.as_str()),
        _ => Uri::empty(),
    }
}

fn hint_field(map: &Map<String, Value>, key: &str) -> f32 {
    map.get(key)
        .and_then(Value::as_f64)
        .map(|hint| hint as f32)
        .unwrap_or(0.0)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
