use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    /// The log or index backend could not be reached. Callers retry or report
    /// unavailability; this never means "no data".
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Consumer group already exists: {0}")]
    GroupAlreadyExists(String),

    #[error("Malformed message {message_id}: {reason}")]
    MalformedMessage { message_id: String, reason: String },

    #[error("Invalid reading: {0}")]
    InvalidReading(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

impl DomainError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DomainError::Unavailable(_))
    }
}
