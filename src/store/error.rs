use thiserror::Error;

/// Errors surfaced by the document store and its clients.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Document already exists: {0}")]
    AlreadyExists(String),
    /// A precondition on a document version did not hold at commit time.
    #[error("Transaction conflict on {0}")]
    Conflict(String),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Document codec error: {0}")]
    Codec(String),
    #[error("Actor communication error: {0}")]
    ActorCommunication(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::Codec(error.to_string())
    }
}
