use serde_json::Value;

use crate::{DecodeError, Envelope};

/// Turns envelopes into transport payloads and back
pub trait EnvelopeCodec: Send + Sync {
    fn encode(&self, envelope: &Envelope) -> Vec<u8>;

    fn decode(&self, payload: &[u8]) -> Result<Envelope, DecodeError>;
}

/// Encodes envelopes as JSON text
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl EnvelopeCodec for JsonCodec {
    fn encode(&self, envelope: &Envelope) -> Vec<u8> {
        // serializing a `Value` into memory cannot fail
        envelope.to_wire_value().to_string().into_bytes()
    }

    fn decode(&self, payload: &[u8]) -> Result<Envelope, DecodeError> {
        let value: Value = serde_json::from_slice(payload).map_err(|err| DecodeError::Malformed {
            len: payload.len(),
            reason: err.to_string(),
        })?;
        Envelope::from_wire_value(&value)
    }
}
