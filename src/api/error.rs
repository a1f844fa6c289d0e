use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::otlp::TranslateError;
use crate::query::ParamError;
use crate::storage::StorageError;
use crate::tenancy::TenancyError;

/// Every failure a gateway request can end with
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Tenancy(#[from] TenancyError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Translate(#[from] TranslateError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Param(_) => StatusCode::BAD_REQUEST,
            ApiError::Tenancy(TenancyError::MissingTenant(_)) => StatusCode::UNAUTHORIZED,
            ApiError::Tenancy(TenancyError::UnknownTenant) => StatusCode::FORBIDDEN,
            ApiError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Storage(StorageError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Translate(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            // Backend details stay in the log
            ApiError::Storage(StorageError::Backend(cause)) => {
                tracing::error!("Storage reader failed: {}", cause);
                "failed to query span storage".to_string()
            }
            ApiError::Translate(e) => {
                tracing::error!("Trace translation failed: {}", e);
                e.to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": {
                "httpCode": status.as_u16(),
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}
