use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::repo::RepoError;

/// Failures of the blog/guest lifecycles. Storage delete failures are not
/// represented here: they are logged by the cleaner and never surface.
#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    #[error("malformed content: {0}")]
    MalformedContent(String),
    #[error("{0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("storage upload failed: {0}")]
    StorageUpload(String),
    #[error("persistence failed: {0}")]
    Persistence(String),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

impl From<RepoError> for LifecycleError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => LifecycleError::NotFound,
            RepoError::Internal(msg) => LifecycleError::Persistence(msg),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] BadRequest(String),
    #[error("unauthorized")] Unauthorized,
    #[error("not found")] NotFound,
    #[error("payload too large")] PayloadTooLarge,
    #[error("unsupported media type")] UnsupportedMediaType,
    #[error("internal error")] Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Internal(msg) => {
                log::error!("repository error: {msg}");
                ApiError::Internal
            }
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::MalformedContent(_) => ApiError::BadRequest(e.to_string()),
            LifecycleError::Validation(msg) => ApiError::BadRequest(msg),
            LifecycleError::NotFound => ApiError::NotFound,
            LifecycleError::StorageUpload(_) | LifecycleError::Persistence(_) => {
                log::error!("request failed: {e}");
                ApiError::Internal
            }
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HttpResponse::build(status).json(ApiErrorBody { error: self.to_string() })
    }
}
