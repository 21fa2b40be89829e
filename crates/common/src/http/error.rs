use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// HTTP status for a domain error.
pub fn domain_error_status(error: &DomainError) -> StatusCode {
    match error {
        DomainError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::InvalidReading(_) | DomainError::MalformedMessage { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        DomainError::GroupAlreadyExists(_) => StatusCode::CONFLICT,
        DomainError::Serialization(_) | DomainError::RepositoryError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Convert a domain error into a `{"error": ...}` JSON response.
pub fn domain_error_to_response(error: &DomainError) -> Response {
    (domain_error_status(error), Json(ErrorBody::new(error.to_string()))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_maps_to_503() {
        let error = DomainError::Unavailable("connection refused".to_string());
        assert_eq!(domain_error_status(&error), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            domain_error_to_response(&error).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_invalid_reading_maps_to_422() {
        let error = DomainError::InvalidReading("power_reading must be >= 0".to_string());
        assert_eq!(domain_error_status(&error), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_repository_error_maps_to_500() {
        let error = DomainError::RepositoryError(anyhow::anyhow!("WRONGTYPE"));
        assert_eq!(
            domain_error_status(&error),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
