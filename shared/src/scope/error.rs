use thiserror::Error;

use crate::LinkKey;

/// Errors that can occur when publishing a link into a scope
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// The owning cell has closed; the link was not added
    #[error("Scope of {cell} is closed")]
    Closed { cell: String },

    /// A link with the same key is already registered
    #[error("{key} is already registered in this scope")]
    Duplicate { key: LinkKey },

    /// A registered link conflicts with the one being added
    #[error("{key} conflicts with {existing}, which is already registered")]
    Conflict { key: LinkKey, existing: LinkKey },
}
