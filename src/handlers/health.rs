use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{error::AppError, state::AppState};

#[derive(Serialize)]
struct HealthResponse {
    success: bool,
    status: &'static str,
    database: &'static str,
}

/// GET /api/health
///
/// Borrows a pooled connection and pings the database, so a saturated or
/// unreachable pool shows up here instead of on the next login.
pub async fn health(State(state): State<AppState>) -> Response {
    let database = match state.db.get().await {
        Ok(client) => match client.simple_query("SELECT 1").await {
            Ok(_) => "up",
            Err(e) => {
                tracing::warn!("Health check query failed: {}", e);
                "down"
            }
        },
        Err(e) => {
            tracing::warn!("Health check could not get a connection: {}", e);
            "down"
        }
    };

    let status_code = if database == "up" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthResponse {
        success: database == "up",
        status: if database == "up" { "ok" } else { "degraded" },
        database,
    };

    (status_code, Json(body)).into_response()
}

/// Fallback for unmatched routes. Renders the standard error envelope with
/// the method and path that missed.
pub async fn not_found(method: Method, uri: Uri) -> Response {
    AppError::RouteNotFound(format!("{} {}", method, uri.path())).into_response()
}
