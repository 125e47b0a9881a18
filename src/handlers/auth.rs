use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tower_cookies::{
    cookie::{time::Duration, SameSite},
    Cookie, Cookies,
};

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::AuthContext,
    models::account::AccountSummary,
    models::session::SessionView,
    models::user::PublicUser,
    services::auth as auth_service,
    state::AppState,
    validation::auth::*,
};

/// Cookie holding the refresh token. HttpOnly; never echoed in a JSON body.
const REFRESH_COOKIE: &str = "refreshToken";

/// The request payload for registration.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    pub role: Option<String>,
}

/// The request payload for login.
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredUser {
    id: String,
    email: String,
    full_name: String,
    phone: String,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct RegisterData {
    user: RegisteredUser,
    account: AccountSummary,
}

#[derive(Serialize)]
struct RegisterResponse {
    success: bool,
    message: &'static str,
    data: RegisterData,
}

#[derive(Serialize)]
struct LoginData {
    user: PublicUser,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginToken {
    access_token: String,
}

#[derive(Serialize)]
struct LoginResponse {
    success: bool,
    message: &'static str,
    data: LoginData,
    token: LoginToken,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    access_token: String,
}

#[derive(Serialize)]
struct RefreshResponse {
    success: bool,
    message: &'static str,
    data: RefreshData,
}

#[derive(Serialize)]
struct MessageResponse {
    success: bool,
    message: &'static str,
}

#[derive(Serialize)]
struct SessionsData {
    sessions: Vec<SessionView>,
    total: usize,
}

#[derive(Serialize)]
struct SessionsResponse {
    success: bool,
    message: &'static str,
    data: SessionsData,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogoutAllData {
    sessions_deactivated: u64,
}

#[derive(Serialize)]
struct LogoutAllResponse {
    success: bool,
    message: &'static str,
    data: LogoutAllData,
}

/// Builds the refresh-token cookie. Secure is flipped on in production so
/// local development over plain HTTP still works.
fn refresh_cookie(value: String, max_age_days: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(REFRESH_COOKIE, value);

    let is_production = std::env::var("APP_ENV")
        .map(|v| v == "production")
        .unwrap_or(false);

    cookie.set_http_only(true);
    if is_production {
        cookie.set_secure(true);
    }
    cookie.set_same_site(SameSite::Strict);
    cookie.set_max_age(Duration::days(max_age_days));
    cookie.set_path("/");

    cookie
}

fn clear_refresh_cookie(cookies: &Cookies) {
    let mut cookie = Cookie::new(REFRESH_COOKIE, "");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_max_age(Duration::seconds(0));
    cookie.set_path("/");
    cookies.remove(cookie);
}

/// Device metadata for the session row: `device-type` header, peer address,
/// user agent.
fn device_info(headers: &HeaderMap, addr: &SocketAddr) -> auth_service::DeviceInfo {
    auth_service::DeviceInfo {
        device_type: headers
            .get("device-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        ip_address: Some(addr.ip().to_string()),
        user_agent: headers
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    tracing::debug!(email = %payload.email, "Register attempt");

    // Presence is the service's job (one error per missing field); shape
    // checks happen here once all fields exist.
    if !payload.email.is_empty() {
        validate_email(&payload.email)?;
    }
    if !payload.password.is_empty() {
        validate_password(&payload.password)?;
    }
    if !payload.phone.is_empty() {
        validate_phone(&payload.phone)?;
    }

    let (user, account) = auth_service::register(
        &state,
        &payload.email,
        &payload.password,
        &payload.full_name,
        &payload.phone,
        payload.role.as_deref(),
    )
    .await?;

    let response = RegisterResponse {
        success: true,
        message: "Registration successful",
        data: RegisterData {
            user: RegisteredUser {
                id: user.id,
                email: user.email,
                full_name: user.full_name,
                phone: user.phone,
                role: user.role,
                created_at: user.created_at,
            },
            account,
        },
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/auth/login
///
/// The refresh token travels only in the HttpOnly cookie; the body carries
/// the access token alone.
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    cookies: Cookies,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    tracing::debug!(email = %payload.email, "Login attempt");

    let device = device_info(&headers, &addr);
    let (user, tokens) =
        auth_service::login(&state, &payload.email, &payload.password, device).await?;

    cookies.add(refresh_cookie(
        tokens.refresh_token,
        state.config.jwt.refresh_ttl_days,
    ));

    let response = LoginResponse {
        success: true,
        message: "Login successful",
        data: LoginData { user },
        token: LoginToken {
            access_token: tokens.access_token,
        },
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Response> {
    let refresh_token = cookies
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::RefreshTokenInvalid)?;

    let tokens = auth_service::refresh_access_token(&state, &refresh_token).await?;

    let response = RefreshResponse {
        success: true,
        message: "Token refreshed",
        data: RefreshData {
            access_token: tokens.access_token,
        },
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// POST /api/auth/logout
///
/// Idempotent: succeeds whether or not an active session matched.
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Result<Response> {
    let refresh_token = cookies.get(REFRESH_COOKIE).map(|c| c.value().to_string());

    auth_service::logout(&state, refresh_token.as_deref()).await?;
    clear_refresh_cookie(&cookies);

    let response = MessageResponse {
        success: true,
        message: "Logout successful",
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// GET /api/auth/sessions
pub async fn get_sessions(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthContext>,
    cookies: Cookies,
) -> Result<Response> {
    let current_refresh = cookies.get(REFRESH_COOKIE).map(|c| c.value().to_string());

    let sessions =
        auth_service::get_user_sessions(&state, &identity.user_id, current_refresh.as_deref())
            .await?;

    let response = SessionsResponse {
        success: true,
        message: "Active sessions retrieved",
        data: SessionsData {
            total: sessions.len(),
            sessions,
        },
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// POST /api/auth/logout-all
pub async fn logout_all(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthContext>,
    cookies: Cookies,
) -> Result<Response> {
    let count = auth_service::logout_all_devices(&state, &identity.user_id).await?;
    clear_refresh_cookie(&cookies);

    let response = LogoutAllResponse {
        success: true,
        message: "Logged out of all devices",
        data: LogoutAllData {
            sessions_deactivated: count,
        },
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// DELETE /api/auth/sessions/{session_id}
///
/// 404 covers both "no such session" and "owned by someone else", so the
/// response never confirms a foreign session id exists.
pub async fn logout_session(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthContext>,
    Path(session_id): Path<String>,
) -> Result<Response> {
    let deactivated =
        auth_service::logout_session_by_id(&state, &session_id, &identity.user_id).await?;

    if !deactivated {
        return Err(AppError::NotFound);
    }

    let response = MessageResponse {
        success: true,
        message: "Logged out of device",
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_cookie_is_locked_down() {
        let cookie = refresh_cookie("opaque-token".to_string(), 7);
        assert_eq!(cookie.name(), "refreshToken");
        assert_eq!(cookie.value(), "opaque-token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::days(7)));
    }

    #[test]
    fn device_info_reads_headers_and_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("device-type", "mobile".parse().unwrap());
        headers.insert(http::header::USER_AGENT, "TestAgent/1.0".parse().unwrap());
        let addr: SocketAddr = "10.0.0.7:55123".parse().unwrap();

        let device = device_info(&headers, &addr);
        assert_eq!(device.device_type.as_deref(), Some("mobile"));
        assert_eq!(device.ip_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(device.user_agent.as_deref(), Some("TestAgent/1.0"));
    }

    #[test]
    fn device_info_tolerates_missing_headers() {
        let headers = HeaderMap::new();
        let addr: SocketAddr = "127.0.0.1:1".parse().unwrap();

        let device = device_info(&headers, &addr);
        assert_eq!(device.device_type, None);
        assert_eq!(device.user_agent, None);
        assert_eq!(device.ip_address.as_deref(), Some("127.0.0.1"));
    }
}
