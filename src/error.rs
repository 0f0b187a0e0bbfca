use actix_web::{error, http::StatusCode, HttpRequest, HttpResponse};
use thiserror::Error;
use validator::ValidationErrors;

use crate::core::MatchError;
use crate::models::ErrorResponse;
use crate::quota::QuotaError;
use crate::services::{CatalogError, StoreError};

/// Error type returned by HTTP handlers
///
/// Each variant maps to one status code and a short machine-readable
/// `error` tag in the JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn tag(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_failed",
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::UnknownTier(_) => "unknown_tier",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "write_conflict",
            ApiError::Upstream(_) => "upstream_error",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl error::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidInput(_) | ApiError::UnknownTier(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.tag().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::InvalidInput(message) => ApiError::InvalidInput(message),
        }
    }
}

impl From<QuotaError> for ApiError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::UnknownTier(tier) => ApiError::UnknownTier(tier),
            QuotaError::NoLedger(_) => ApiError::NotFound(err.to_string()),
            QuotaError::LedgerWriteConflict { .. } => ApiError::Conflict(err.to_string()),
            QuotaError::InvalidTier(_) | QuotaError::Store(_) => {
                tracing::error!("Quota operation failed: {}", err);
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::from(QuotaError::from(err))
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(message) => ApiError::NotFound(message),
            other => {
                tracing::error!("Catalog request failed: {}", other);
                ApiError::Upstream(other.to_string())
            }
        }
    }
}

/// Turn JSON body extraction failures into the standard error body
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    ApiError::Validation(format!("Invalid JSON: {}", err)).into()
}

/// Turn query string extraction failures into the standard error body
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(format!("Invalid query: {}", err)).into()
}

/// Turn path extraction failures into the standard error body
pub fn handle_path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(format!("Invalid path: {}", err)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(QuotaError::UnknownTier("gold".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(QuotaError::LedgerWriteConflict {
                user_id: "u".into(),
                attempts: 5
            })
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(QuotaError::NoLedger("ghost".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(CatalogError::NotFound("profile".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(CatalogError::ApiError("503".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(MatchError::InvalidInput("cgpa".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[actix_web::test]
    async fn test_error_body() {
        let response = ApiError::UnknownTier("gold".into()).error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "unknown_tier");
        assert_eq!(json["message"], "Unknown tier: gold");
        assert_eq!(json["statusCode"], 400);
    }
}
