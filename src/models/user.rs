use chrono::{DateTime, Utc};
use serde::Serialize;

/// Represents a user profile.
///
/// Credentials live in the separate `accounts` table; this row carries no
/// password material.
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user (`usr_…`, immutable).
    pub id: String,
    /// The user's email address.
    pub email: String,
    /// The user's full name.
    pub full_name: String,
    /// The user's phone number.
    pub phone: String,
    /// The user's role (`customer`, `admin`, …).
    pub role: String,
    /// Whether the user may log in at all.
    pub is_active: bool,
    /// Whether an administrator has blocked the user post-issuance.
    pub is_blocked: bool,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The profile fields exposed over the wire.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role.clone(),
        }
    }
}
