use thiserror::Error;

/// Errors that can occur while decoding an envelope.
///
/// Only a missing or unrecognized tag is an error; any other malformation
/// decodes with best-effort defaults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload could not be parsed by the structured-value codec at all
    #[error("Malformed envelope payload of {len} bytes: {reason}")]
    Malformed { len: usize, reason: String },

    /// The decoded value is not an object, so it cannot carry a tag
    #[error("Envelope must be an object carrying a tag, got {kind}")]
    NotAnObject { kind: &'static str },

    /// The object carries no `tag` string
    #[error("Envelope is missing its tag")]
    MissingTag,

    /// The tag is not one of the known protocol verbs
    #[error("Unknown envelope tag {tag:?}")]
    UnknownTag { tag: String },
}
