use chrono::{DateTime, Utc};
use serde::Serialize;

/// Represents a single authenticated device/login instance.
///
/// Valid for use only while `is_active` is true AND `expires_at` is in the
/// future. Logout flips `is_active` (logical delete); the background reaper
/// physically deletes rows once expired or long-deactivated.
#[derive(Clone, Debug)]
pub struct Session {
    /// The unique identifier for the session (`ses_…`).
    pub id: String,
    /// The owning user.
    pub user_id: String,
    /// The account that logged in.
    pub account_id: String,
    /// The current access token value, stored for lookup/audit.
    pub session_token: String,
    /// The long-lived refresh token; primary lookup key for refresh/logout.
    pub refresh_token: String,
    /// Device type reported at login (mobile, tablet, desktop, unknown).
    pub device_type: String,
    /// Client IP at login, when known.
    pub ip_address: Option<String>,
    /// Client user agent at login, when known.
    pub user_agent: Option<String>,
    /// Whether the session is still usable.
    pub is_active: bool,
    /// Hard expiry; refreshes past this point are rejected.
    pub expires_at: DateTime<Utc>,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// Updated on every refresh.
    pub last_activity_at: DateTime<Utc>,
}

/// Refresh-time join: the session plus the identity claims sourced from the
/// owning user row.
#[derive(Clone, Debug)]
pub struct SessionWithUser {
    pub id: String,
    pub user_id: String,
    pub account_id: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub role: String,
    pub email: String,
    pub user_is_active: bool,
}

/// One entry in the user's device list.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: String,
    pub device_type: String,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Best-effort: true when this row's refresh token matches the caller's.
    pub is_current: bool,
}
