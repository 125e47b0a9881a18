use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};

use http::{header, Method};
use std::net::SocketAddr;
use std::time::Duration;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod ids;
mod state;

mod models {
    pub mod account;
    pub mod session;
    pub mod user;
}

mod repositories {
    pub mod account;
    pub mod session;
    pub mod user;
}

mod services {
    pub mod auth;
    pub mod tokens;
}

mod handlers {
    pub mod auth;
    pub mod health;
}

mod middleware_layer {
    pub mod auth;
    pub mod request_meta;
}

mod validation {
    pub mod auth;
}

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config)?;
    tracing::info!("✅ AppState initialized with connection pool");

    let cors = CorsLayer::new()
        .allow_origin([
            "http://localhost:3000".parse().unwrap(),
            "http://127.0.0.1:3000".parse().unwrap(),
            "http://[::1]:3000".parse().unwrap(),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::COOKIE,
            "device-type".parse().unwrap(),
            "x-request-id".parse().unwrap(),
        ])
        .allow_credentials(true)
        .expose_headers(["x-request-id".parse().unwrap()])
        .max_age(Duration::from_secs(86400));

    let public_routes = Router::new()
        .route("/api/health", get(handlers::health::health))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/auth/sessions", get(handlers::auth::get_sessions))
        .route("/api/auth/logout-all", post(handlers::auth::logout_all))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    // Revoking another device is destructive, so this route pays for the
    // DB-backed gate that also catches accounts blocked after token issuance.
    let session_delete_routes = Router::new()
        .route(
            "/api/auth/sessions/{session_id}",
            delete(handlers::auth::logout_session),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth_with_user,
        ))
        .with_state(state.clone());

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(session_delete_routes)
        .fallback(handlers::health::not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CookieManagerLayer::new())
        .layer(cors)
        .layer(from_fn(middleware_layer::request_meta::request_meta));

    let reaper_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            tracing::info!("🧹 Running scheduled cleanup of expired sessions...");
            match repositories::session::delete_expired(&reaper_state.db).await {
                Ok(removed) => {
                    tracing::info!("✅ Session cleanup completed, {} rows removed", removed);
                }
                Err(e) => {
                    tracing::error!("❌ Session cleanup failed: {}", e);
                }
            }
        }
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("✅ Background session cleanup job started (runs every hour)");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
