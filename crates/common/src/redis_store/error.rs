use crate::domain::DomainError;
use redis::RedisError;

/// Maps Redis failures onto the domain taxonomy: connectivity problems are
/// transient, `BUSYGROUP` means the consumer group exists, the rest is a
/// repository error.
impl From<RedisError> for DomainError {
    fn from(err: RedisError) -> Self {
        if err.code() == Some("BUSYGROUP") {
            return DomainError::GroupAlreadyExists(err.detail().unwrap_or_default().to_string());
        }

        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            return DomainError::Unavailable(err.to_string());
        }

        DomainError::RepositoryError(anyhow::Error::new(err))
    }
}
