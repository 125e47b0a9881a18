use crate::error::{AppError, FieldError, Result};
use crate::ids;
use crate::models::account::{AccountSummary, AccountType};
use crate::models::session::SessionView;
use crate::models::user::{PublicUser, User};
use crate::repositories::{account as account_repo, session as session_repo, user as user_repo};
use crate::services::tokens;
use crate::state::AppState;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 2;

/// Device metadata captured at login.
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub device_type: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// The token pair minted at login.
pub struct TokenPair {
    pub access_token: String,
    /// Cookie-only on the wire; must never appear in a JSON body.
    pub refresh_token: String,
}

/// Hashes a password with Argon2id.
fn hash_password(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Salt encoding error: {e}")))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Internal(format!("Argon2 params: {e}")))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Internal(format!("Argon2 hash error: {e}")))?
        .to_string();

    password_bytes.zeroize();
    Ok(password_hash)
}

/// Verifies a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let mut password_bytes = password.as_bytes().to_vec();
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Hash parse error: {e}")))?;
    let result = Argon2::default()
        .verify_password(&password_bytes, &parsed_hash)
        .is_ok();

    password_bytes.zeroize();
    Ok(result)
}

/// Registers a new user: profile row plus an email credential account.
///
/// IDs and the password hash are computed up front; the two inserts then run
/// inside a single transaction so a partial write (user without account)
/// cannot be observed.
pub async fn register(
    state: &AppState,
    email: &str,
    password: &str,
    full_name: &str,
    phone: &str,
    role: Option<&str>,
) -> Result<(User, AccountSummary)> {
    let mut missing = Vec::new();
    if email.is_empty() {
        missing.push(FieldError::new("email", "Email is required"));
    }
    if password.is_empty() {
        missing.push(FieldError::new("password", "Password is required"));
    }
    if full_name.is_empty() {
        missing.push(FieldError::new("fullName", "Full name is required"));
    }
    if phone.is_empty() {
        missing.push(FieldError::new("phone", "Phone number is required"));
    }
    if !missing.is_empty() {
        return Err(AppError::Validation(missing));
    }

    let role = role.unwrap_or("customer");
    let user_id = ids::new_id(ids::USER_PREFIX);
    let account_id = ids::new_id(ids::ACCOUNT_PREFIX);
    let password_hash = hash_password(password)?;

    let mut client = state.db.get().await?;
    let tx = client.transaction().await.map_err(AppError::from)?;

    let user = user_repo::insert_user(&tx, &user_id, email, full_name, phone, role).await?;
    let account = account_repo::insert_account(
        &tx,
        &account_id,
        &user_id,
        AccountType::Email,
        email,
        &password_hash,
    )
    .await?;

    tx.commit().await.map_err(AppError::from)?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok((user, AccountSummary::from(&account)))
}

/// Authenticates an email/password pair and opens a new session.
///
/// Each step is a hard gate; the first failure wins and no session is
/// created.
pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
    device: DeviceInfo,
) -> Result<(PublicUser, TokenPair)> {
    let mut missing = Vec::new();
    if email.is_empty() {
        missing.push(FieldError::new("email", "Email is required"));
    }
    if password.is_empty() {
        missing.push(FieldError::new("password", "Password is required"));
    }
    if !missing.is_empty() {
        return Err(AppError::Validation(missing));
    }

    let account = account_repo::find_by_identifier_with_user(&state.db, email)
        .await?
        .ok_or(AppError::AccountNotFound)?;

    if !account.user_is_active {
        return Err(AppError::AccountLocked);
    }

    let hash = account
        .password_hash
        .as_deref()
        .ok_or(AppError::CredentialsInvalid)?;
    if !verify_password(password, hash)? {
        return Err(AppError::CredentialsInvalid);
    }

    let access_token = tokens::sign_access_token(
        &account.id,
        &account.user_id,
        &account.role,
        &account.email,
        &state.config.jwt,
    )
    .map_err(|e| AppError::Internal(format!("Token signing failed: {e}")))?;
    let refresh_token = tokens::sign_refresh_token(&account.id, &account.user_id, &state.config.jwt)
        .map_err(|e| AppError::Internal(format!("Token signing failed: {e}")))?;

    let session_id = ids::new_id(ids::SESSION_PREFIX);
    let expires_at =
        chrono::Utc::now() + chrono::Duration::days(state.config.jwt.refresh_ttl_days);
    session_repo::create_session(
        &state.db,
        &session_repo::NewSession {
            id: &session_id,
            user_id: &account.user_id,
            account_id: &account.id,
            session_token: &access_token,
            refresh_token: &refresh_token,
            device_type: device.device_type.as_deref().unwrap_or("unknown"),
            ip_address: device.ip_address.as_deref(),
            user_agent: device.user_agent.as_deref(),
            expires_at,
        },
    )
    .await?;

    tracing::info!(user_id = %account.user_id, session_id = %session_id, "User logged in");

    let user = PublicUser {
        id: account.user_id.clone(),
        full_name: account.full_name.clone(),
        email: account.email.clone(),
        phone: account.phone.clone(),
        role: account.role.clone(),
    };

    Ok((
        user,
        TokenPair {
            access_token,
            refresh_token,
        },
    ))
}

/// Exchanges a refresh token for a new access token.
///
/// The token's own expiry claim and the session's stored expiry are two
/// independent checks; both must pass. Identity claims for the new access
/// token come from the session join, not a fresh account fetch, so a role
/// change only takes effect on the next login.
pub async fn refresh_access_token(state: &AppState, refresh_token: &str) -> Result<TokenPair> {
    if refresh_token.is_empty() {
        return Err(AppError::RefreshTokenInvalid);
    }

    // Any cryptographic failure (bad signature, expired, malformed) collapses
    // to the same error so callers learn nothing about which it was.
    tokens::verify_refresh_token(refresh_token, &state.config.jwt)
        .map_err(|_| AppError::RefreshTokenInvalid)?;

    let session = session_repo::find_by_refresh_token(&state.db, refresh_token)
        .await?
        .ok_or(AppError::RefreshTokenInvalid)?;

    if !session.user_is_active {
        return Err(AppError::AccountLocked);
    }

    let new_access_token = tokens::sign_access_token(
        &session.account_id,
        &session.user_id,
        &session.role,
        &session.email,
        &state.config.jwt,
    )
    .map_err(|e| AppError::Internal(format!("Token signing failed: {e}")))?;

    if !session_repo::update_session_token(&state.db, refresh_token, &new_access_token).await? {
        // Session was deactivated or expired between lookup and update.
        return Err(AppError::RefreshTokenInvalid);
    }

    tracing::debug!(session_id = %session.id, "Access token refreshed");

    // The refresh token is never rotated in this design.
    Ok(TokenPair {
        access_token: new_access_token,
        refresh_token: refresh_token.to_string(),
    })
}

/// Deactivates the session bound to a refresh token.
///
/// Idempotent: a missing token, or one with no active session, is a no-op
/// reported as `false`.
pub async fn logout(state: &AppState, refresh_token: Option<&str>) -> Result<bool> {
    let Some(token) = refresh_token.filter(|t| !t.is_empty()) else {
        return Ok(false);
    };

    let deactivated = session_repo::deactivate_by_refresh_token(&state.db, token).await?;
    if deactivated {
        tracing::info!("Session deactivated on logout");
    }
    Ok(deactivated)
}

/// Deactivates every active session for the user. Returns the count.
pub async fn logout_all_devices(state: &AppState, user_id: &str) -> Result<u64> {
    let count = session_repo::deactivate_all_for_user(&state.db, user_id).await?;
    tracing::info!(user_id = %user_id, count, "Logged out of all devices");
    Ok(count)
}

/// Deactivates one session by id, only when owned by the caller.
///
/// Returns false for both "not found" and "not owned" so the handler can map
/// either to 404 without confirming the id exists under another account.
pub async fn logout_session_by_id(
    state: &AppState,
    session_id: &str,
    user_id: &str,
) -> Result<bool> {
    if session_id.is_empty() {
        return Ok(false);
    }
    session_repo::deactivate_by_id(&state.db, session_id, user_id).await
}

/// Lists the user's active sessions, marking the caller's own.
pub async fn get_user_sessions(
    state: &AppState,
    user_id: &str,
    current_refresh_token: Option<&str>,
) -> Result<Vec<SessionView>> {
    let sessions = session_repo::list_active_for_user(&state.db, user_id).await?;

    Ok(sessions
        .into_iter()
        .map(|s| SessionView {
            is_current: current_refresh_token == Some(s.refresh_token.as_str()),
            id: s.id,
            device_type: s.device_type,
            ip_address: s.ip_address,
            created_at: s.created_at,
            last_activity: s.last_activity_at,
            expires_at: s.expires_at,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("Secret123").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Secret123", &hash).expect("verify should succeed"));
        assert!(!verify_password("Secret124", &hash).expect("verify should succeed"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("Secret123").expect("hashing should succeed");
        let b = hash_password("Secret123").expect("hashing should succeed");
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("Secret123", "not-a-phc-string").is_err());
    }
}
