use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use referral_types::api::{ErrorDetail, ErrorResponse};

use crate::access::AccessError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Access(#[from] AccessError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // The cause is already logged by MessageAccess; clients only learn
        // which operation failed.
        let (status, code, message) = match &self {
            ApiError::Access(e) => (
                StatusCode::BAD_GATEWAY,
                "store_unavailable",
                format!("message {} failed", e.operation()),
            ),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}
