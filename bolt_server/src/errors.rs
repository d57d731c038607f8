use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use bolt_engine::{events::DispatchError, traits::UserManagementError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Unauthorized. {0}")]
    Unauthorized(String),
    #[error("Too many requests. {0}")]
    TooManyRequests(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Slack API error. {0}")]
    SlackError(#[from] SlackApiError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SlackError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<DispatchError> for ServerError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Busy => Self::TooManyRequests(e.to_string()),
            DispatchError::Closed => Self::BackendError(e.to_string()),
        }
    }
}

impl From<UserManagementError> for ServerError {
    fn from(e: UserManagementError) -> Self {
        Self::BackendError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum SlackApiError {
    #[error("Could not reach Slack. {0}")]
    Request(String),
    #[error("Slack responded with status {0}")]
    Status(u16),
    #[error("Could not read the Slack response. {0}")]
    Json(String),
    /// Slack answered with `ok: false`.
    #[error("{method} failed: {error}")]
    Api { method: String, error: String },
    #[error("{0}")]
    Missing(String),
}
