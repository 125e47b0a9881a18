use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// A single field-level validation failure.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// The application's error type.
///
/// Every variant is an operational error with a stable wire code; raw driver
/// errors are converted here (via `From`) and never reach the client.
#[derive(Error, Debug)]
pub enum AppError {
    /// One or more request fields failed validation.
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// No account matches the given identifier.
    #[error("Account not found")]
    AccountNotFound,

    /// Password mismatch for an existing account.
    #[error("Invalid email or password")]
    CredentialsInvalid,

    /// The owning user is deactivated.
    #[error("Account is locked")]
    AccountLocked,

    /// No access token on a protected route.
    #[error("Access denied, no token provided")]
    TokenMissing,

    /// Malformed or badly signed access token.
    #[error("Invalid token")]
    TokenInvalid,

    /// Access token past its expiry claim.
    #[error("Token has expired")]
    TokenExpired,

    /// Missing, malformed, expired, or revoked refresh token.
    #[error("Invalid refresh token")]
    RefreshTokenInvalid,

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A domain resource does not exist (or is not owned by the caller).
    #[error("Resource not found")]
    NotFound,

    /// No route matched the request; distinct from domain `NotFound`.
    #[error("No route for {0}")]
    RouteNotFound(String),

    /// Duplicate identifier or similar uniqueness conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A business-rule violation on otherwise well-formed input. Part of the
    /// wire taxonomy; no auth flow produces it.
    #[allow(dead_code)]
    #[error("Unprocessable: {0}")]
    UnprocessableState(String),

    /// A database error.
    #[error("Database error: {0}")]
    Database(tokio_postgres::Error),

    /// A pool build error.
    #[error("Pool error: {0}")]
    PoolBuild(#[from] deadpool_postgres::CreatePoolError),

    /// Timed out waiting on the store.
    #[error("Operation timed out")]
    Timeout,

    /// An upstream dependency failed. Part of the wire taxonomy; no auth
    /// flow produces it.
    #[allow(dead_code)]
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        // Unique-violation is the one driver error with domain meaning:
        // a duplicate identifier surfaces as 409 instead of 500.
        if let Some(db_err) = err.as_db_error() {
            if *db_err.code() == tokio_postgres::error::SqlState::UNIQUE_VIOLATION {
                return AppError::Conflict("Identifier already in use".to_string());
            }
        }
        AppError::Database(err)
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Timeout(_) => AppError::Timeout,
            other => AppError::Internal(format!("Connection pool failure: {other}")),
        }
    }
}

/// Whether the process runs with production error redaction.
fn is_production() -> bool {
    std::env::var("APP_ENV")
        .map(|v| v == "production")
        .unwrap_or(false)
}

/// The pieces of the wire envelope known at error-conversion time.
///
/// `path` and `request_id` are stamped in later by the outermost
/// [`request_meta`](crate::middleware_layer::request_meta) middleware, which
/// finds this struct in the response extensions.
#[derive(Debug, Clone)]
pub struct ErrorParts {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Vec<FieldError>>,
    pub timestamp: String,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [FieldError]>,
    timestamp: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: ErrorDetail<'a>,
}

/// Serializes the shared error envelope, optionally with request correlation.
pub fn render_envelope(parts: &ErrorParts, path: Option<&str>, request_id: Option<&str>) -> String {
    let body = ErrorBody {
        success: false,
        error: ErrorDetail {
            code: parts.code,
            message: &parts.message,
            details: parts.details.as_deref(),
            timestamp: &parts.timestamp,
            path,
            request_id,
        },
    };
    sonic_rs::to_string(&body)
        .unwrap_or_else(|_| r#"{"success":false,"error":{"code":"INTERNAL_ERROR"}}"#.to_string())
}

impl AppError {
    /// HTTP status, stable wire code, client-facing message, field details.
    pub fn parts(&self) -> (StatusCode, &'static str, String, Option<Vec<FieldError>>) {
        match self {
            AppError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Request validation failed".to_string(),
                Some(fields.clone()),
            ),
            AppError::AccountNotFound => (
                StatusCode::UNAUTHORIZED,
                "AUTH_ACCOUNT_NOT_FOUND",
                "Account does not exist".to_string(),
                None,
            ),
            AppError::CredentialsInvalid => (
                StatusCode::UNAUTHORIZED,
                "AUTH_CREDENTIALS_INVALID",
                "Invalid email or password".to_string(),
                None,
            ),
            AppError::AccountLocked => (
                StatusCode::UNAUTHORIZED,
                "AUTH_ACCOUNT_LOCKED",
                "Account is locked".to_string(),
                None,
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_MISSING",
                "Access denied, no token provided".to_string(),
                None,
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_INVALID",
                "Invalid token".to_string(),
                None,
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_EXPIRED",
                "Token has expired".to_string(),
                None,
            ),
            AppError::RefreshTokenInvalid => (
                StatusCode::UNAUTHORIZED,
                "REFRESH_TOKEN_INVALID",
                "Invalid refresh token".to_string(),
                None,
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone(), None),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Resource not found".to_string(),
                None,
            ),
            AppError::RouteNotFound(route) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("No route for {route}"),
                None,
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "DUPLICATE_ENTRY", msg.clone(), None),
            AppError::UnprocessableState(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_STATE",
                msg.clone(),
                None,
            ),
            AppError::Database(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                if is_production() {
                    "Database query failed".to_string()
                } else {
                    format!("Database query failed: {e}")
                },
                None,
            ),
            AppError::PoolBuild(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                if is_production() {
                    "Database unavailable".to_string()
                } else {
                    format!("Database unavailable: {e}")
                },
                None,
            ),
            AppError::Timeout => (
                StatusCode::REQUEST_TIMEOUT,
                "TIMEOUT",
                "Operation timed out".to_string(),
                None,
            ),
            AppError::Gateway(msg) => (
                StatusCode::BAD_GATEWAY,
                "GATEWAY_ERROR",
                if is_production() {
                    "Upstream service failed".to_string()
                } else {
                    msg.clone()
                },
                None,
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                if is_production() {
                    "Internal server error".to_string()
                } else {
                    msg.clone()
                },
                None,
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();

        match &self {
            AppError::Database(e) => tracing::error!("Database error: {}", e),
            AppError::PoolBuild(e) => tracing::error!("Pool error: {}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            AppError::Gateway(msg) => tracing::error!("Gateway error: {}", msg),
            AppError::Validation(_) | AppError::NotFound | AppError::RouteNotFound(_) => {
                tracing::debug!("{}", self)
            }
            other => tracing::warn!("{}", other),
        }

        let parts = ErrorParts {
            code,
            message,
            details,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let body = render_envelope(&parts, None, None);
        let mut response = (
            status,
            [(http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response();
        // Leave the parts behind so request_meta can re-render the body with
        // path and requestId added.
        response.extensions_mut().insert(parts);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_carries_one_entry_per_field() {
        let err = AppError::Validation(vec![
            FieldError::new("email", "Email is required"),
            FieldError::new("phone", "Phone is required"),
        ]);
        let (status, code, _, details) = err.parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "VALIDATION_ERROR");
        assert_eq!(details.unwrap().len(), 2);
    }

    #[test]
    fn auth_failures_are_all_unauthorized() {
        for err in [
            AppError::AccountNotFound,
            AppError::CredentialsInvalid,
            AppError::AccountLocked,
            AppError::TokenMissing,
            AppError::TokenInvalid,
            AppError::TokenExpired,
            AppError::RefreshTokenInvalid,
        ] {
            assert_eq!(err.parts().0, StatusCode::UNAUTHORIZED, "{err}");
        }
    }

    #[test]
    fn expired_and_invalid_tokens_have_distinct_codes() {
        assert_eq!(AppError::TokenExpired.parts().1, "TOKEN_EXPIRED");
        assert_eq!(AppError::TokenInvalid.parts().1, "TOKEN_INVALID");
    }

    #[test]
    fn envelope_includes_correlation_when_known() {
        let parts = ErrorParts {
            code: "NOT_FOUND",
            message: "Resource not found".to_string(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let body = render_envelope(&parts, Some("/api/auth/sessions"), Some("req_abc123"));
        assert!(body.contains(r#""success":false"#));
        assert!(body.contains(r#""path":"/api/auth/sessions""#));
        assert!(body.contains(r#""requestId":"req_abc123""#));
    }

    #[test]
    fn envelope_omits_correlation_when_unknown() {
        let parts = ErrorParts {
            code: "TOKEN_MISSING",
            message: "Access denied".to_string(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let body = render_envelope(&parts, None, None);
        assert!(!body.contains("requestId"));
        assert!(!body.contains(r#""path""#));
    }
}
