/// Error types for the duplicate tab engine
use thiserror::Error;

/// A browser tab primitive (query, remove, create) failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        BackendError(message.into())
    }
}

/// Caller-facing failures of engine operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("failed to query tabs: {0}")]
    Query(BackendError),

    #[error("no tabs selected")]
    NoSelection,

    #[error("no safe tabs to close")]
    NoSafeTabs,

    #[error("failed to close tabs: {0}")]
    Close(BackendError),

    #[error("nothing to undo")]
    NothingToUndo,
}
