use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure taxonomy for the whole API. Every variant renders as a
/// `{status, detail}` JSON body; auth failures additionally carry the
/// `WWW-Authenticate: Bearer` challenge.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A supplied foreign id does not resolve to an existing row.
    #[error("{0}")]
    InvalidReference(String),

    #[error("{0}")]
    Validation(String),

    /// Bad credentials or an unusable bearer token. The detail is kept
    /// uniform for credential failures so callers cannot probe logins.
    #[error("{0}")]
    AuthFailure(String),

    /// Account exists and the password verified, but `is_active` is false.
    #[error("Inactive account")]
    Inactive,

    #[error("{0}")]
    Forbidden(String),

    /// Schedule export failed mid-generation; the cause is surfaced.
    #[error("Schedule export failed: {0}")]
    Export(String),

    /// Unexpected storage or runtime error. Logged with the cause,
    /// rendered generically.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    fn challenge(&self) -> bool {
        matches!(self, Self::AuthFailure(_))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidReference(_) | Self::Validation(_) | Self::Inactive => {
                StatusCode::BAD_REQUEST
            }
            Self::AuthFailure(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Export(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Self::Internal(cause) = self {
            error!(cause = %cause, "internal error");
        }

        let status = self.status_code();
        let mut builder = HttpResponse::build(status);
        if self.challenge() {
            builder.insert_header(("WWW-Authenticate", "Bearer"));
        }
        builder.json(json!({
            "status": status.as_u16(),
            "detail": self.to_string(),
        }))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error().map(|db| db.kind()) {
            // Constraint raced past the in-transaction pre-check.
            Some(sqlx::error::ErrorKind::UniqueViolation) => {
                Self::Conflict("Resource already exists".to_string())
            }
            Some(sqlx::error::ErrorKind::ForeignKeyViolation) => {
                Self::Conflict("Resource is referenced by other records".to_string())
            }
            _ => Self::Internal(e.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
