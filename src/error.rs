use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::generator::GenerationError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: Option<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown error").to_owned(),
            message,
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Generation(GenerationError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            Error::Generation(GenerationError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Error::Generation(_) => StatusCode::BAD_GATEWAY,
            Error::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match self {
            Error::Persistence(e) => {
                log::error!("Persistence failure: {}", e);
                "The request could not be completed due to a storage error".to_owned()
            }
            Error::Generation(e) => {
                log::warn!("Quiz generation failed: {}", e);
                e.to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(status).json(ErrorResponse::new(status, Some(message)))
    }
}

/// Maps unique-constraint violations to [`Error::Conflict`], everything else to persistence.
pub fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict(message.into()),
        _ => Error::Persistence(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{ModelError, SchemaViolation};
    use std::time::Duration;

    #[test]
    fn generation_failures_map_to_gateway_statuses() {
        let timeout = Error::from(GenerationError::Timeout(Duration::from_secs(1)));
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let model = Error::from(GenerationError::Model(ModelError::EmptyResponse));
        assert_eq!(model.status_code(), StatusCode::BAD_GATEWAY);

        let schema = Error::from(GenerationError::Schema(SchemaViolation::NotASequence));
        assert_eq!(schema.status_code(), StatusCode::BAD_GATEWAY);

        let invalid = Error::from(GenerationError::InvalidRequest("subject must not be empty"));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn payload_carries_status_and_reason() {
        let payload = ErrorResponse::new(StatusCode::NOT_FOUND, Some("quiz not found".into()));
        let json = serde_json::to_value(payload).unwrap();
        assert_eq!(json["statusCode"], 404);
        assert_eq!(json["error"], "Not Found");
        assert_eq!(json["message"], "quiz not found");
    }
}
