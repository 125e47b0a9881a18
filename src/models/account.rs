use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Login method bound to an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Email,
    Phone,
    Oauth,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Email => "email",
            AccountType::Phone => "phone",
            AccountType::Oauth => "oauth",
        }
    }

    pub fn from_str(value: &str) -> Result<Self> {
        match value {
            "email" => Ok(AccountType::Email),
            "phone" => Ok(AccountType::Phone),
            "oauth" => Ok(AccountType::Oauth),
            other => Err(AppError::Internal(format!("Unknown account type: {other}"))),
        }
    }
}

/// Represents a credential binding for a user.
///
/// A user may hold several accounts (one per login method); the `identifier`
/// is unique system-wide and is the login lookup key.
#[derive(Clone, Debug)]
pub struct Account {
    /// The unique identifier for the account (`acc_…`).
    pub id: String,
    /// The owning user.
    pub user_id: String,
    /// The login method.
    pub account_type: AccountType,
    /// The login handle (email address for `email` accounts).
    pub identifier: String,
    /// Whether the identifier has been verified.
    pub is_verified: bool,
    /// The timestamp when the account was created.
    pub created_at: DateTime<Utc>,
}

/// The redacted account view returned by registration. Never carries the hash.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub account_type: AccountType,
    pub identifier: String,
    pub is_verified: bool,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            account_type: account.account_type,
            identifier: account.identifier.clone(),
            is_verified: account.is_verified,
        }
    }
}

/// The login-lookup join: account columns plus the owning user's profile.
#[derive(Clone, Debug)]
pub struct AccountWithUser {
    pub id: String,
    pub user_id: String,
    pub identifier: String,
    /// Null for pure-OAuth accounts.
    pub password_hash: Option<String>,
    pub account_type: AccountType,
    pub is_verified: bool,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub user_is_active: bool,
}
