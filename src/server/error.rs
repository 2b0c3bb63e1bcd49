use axum::{ http::StatusCode, response::{ IntoResponse, Response }, Json };
use thiserror::Error;
use crate::history::StoreError;
use crate::models::api::ErrorResponse;

pub const MISSING_STORE_MESSAGE: &str =
    "Conversation store is not configured. Set HISTORY_TYPE (file, redis, memory) and HISTORY_HOST, then restart the server.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{}", MISSING_STORE_MESSAGE)]
    StorageUnavailable,
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}
