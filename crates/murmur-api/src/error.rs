use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use murmur_db::DbError;
use murmur_types::api::ErrorResponse;

/// Every failure a handler can report. Each variant has a stable `kind` and
/// a message that is safe to show to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// Delete that removed nothing. Reported as a bad request, not a 404.
    #[error("message not found or already deleted")]
    MessageNotFound,

    #[error("verification code has expired, please sign up again to get a new code")]
    ExpiredCode,

    #[error("{0}")]
    InvalidCode(String),

    #[error("user is not accepting messages")]
    MessageRejected,

    #[error("{0}")]
    Delivery(String),

    #[error("{0}")]
    Provider(String),

    #[error("{0}")]
    Auth(String),

    /// Store or runtime failure. The source is logged, never rendered.
    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) | Self::MessageNotFound => "not_found",
            Self::ExpiredCode => "expired_code",
            Self::InvalidCode(_) => "invalid_code",
            Self::MessageRejected => "message_rejected",
            Self::Delivery(_) => "delivery",
            Self::Provider(_) => "provider",
            Self::Auth(_) => "auth",
            Self::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::MessageNotFound
            | Self::ExpiredCode
            | Self::InvalidCode(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MessageRejected => StatusCode::FORBIDDEN,
            Self::Delivery(_) | Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(msg) => Self::Conflict(msg.to_string()),
            DbError::Internal(e) => Self::Internal(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(source) = &self {
            error!("Internal error: {:#}", source);
        }

        let body = ErrorResponse {
            success: false,
            kind: self.kind().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
