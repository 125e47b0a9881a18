use crate::error::Result;
use crate::models::session::{Session, SessionWithUser};
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;

fn row_to_session(row: &Row) -> Result<Session> {
    Ok(Session {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        account_id: row.try_get("account_id")?,
        session_token: row.try_get("session_token")?,
        refresh_token: row.try_get("refresh_token")?,
        device_type: row.try_get("device_type")?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        is_active: row.try_get("is_active")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
        last_activity_at: row.try_get("last_activity_at")?,
    })
}

/// Parameters for a new session row.
pub struct NewSession<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub account_id: &'a str,
    pub session_token: &'a str,
    pub refresh_token: &'a str,
    pub device_type: &'a str,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub expires_at: DateTime<Utc>,
}

/// Persists a new session at login.
pub async fn create_session(pool: &Pool, input: &NewSession<'_>) -> Result<Session> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO sessions (
                id, user_id, account_id, session_token, refresh_token,
                device_type, ip_address, user_agent, is_active,
                expires_at, created_at, last_activity_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, $9, NOW(), NOW())
            RETURNING id, user_id, account_id, session_token, refresh_token,
                      device_type, ip_address, user_agent, is_active,
                      expires_at, created_at, last_activity_at
            "#,
            &[
                &input.id,
                &input.user_id,
                &input.account_id,
                &input.session_token,
                &input.refresh_token,
                &input.device_type,
                &input.ip_address,
                &input.user_agent,
                &input.expires_at,
            ],
        )
        .await?;
    row_to_session(&row)
}

/// Finds a usable session by exact refresh-token value, joined with the
/// owning user's identity claims.
///
/// The WHERE clause enforces the session-side validity check (`is_active`
/// and stored expiry); the token's own expiry claim is verified separately
/// by the token issuer.
pub async fn find_by_refresh_token(
    pool: &Pool,
    refresh_token: &str,
) -> Result<Option<SessionWithUser>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT
                s.id,
                s.user_id,
                s.account_id,
                s.refresh_token,
                s.expires_at,
                u.role,
                u.email,
                u.is_active AS user_is_active
            FROM sessions s
            INNER JOIN users u ON s.user_id = u.id
            WHERE s.refresh_token = $1
              AND s.is_active = TRUE
              AND s.expires_at > NOW()
            LIMIT 1
            "#,
            &[&refresh_token],
        )
        .await?;

    row.map(|r| {
        Ok(SessionWithUser {
            id: r.try_get("id")?,
            user_id: r.try_get("user_id")?,
            account_id: r.try_get("account_id")?,
            refresh_token: r.try_get("refresh_token")?,
            expires_at: r.try_get("expires_at")?,
            role: r.try_get("role")?,
            email: r.try_get("email")?,
            user_is_active: r.try_get("user_is_active")?,
        })
    })
    .transpose()
}

/// Swaps in a freshly minted access token after a refresh. The refresh token
/// itself is never rotated.
///
/// Returns false when no active, unexpired session matches.
pub async fn update_session_token(
    pool: &Pool,
    refresh_token: &str,
    new_session_token: &str,
) -> Result<bool> {
    let client = pool.get().await?;
    let affected = client
        .execute(
            r#"
            UPDATE sessions
            SET session_token = $1,
                last_activity_at = NOW()
            WHERE refresh_token = $2
              AND is_active = TRUE
              AND expires_at > NOW()
            "#,
            &[&new_session_token, &refresh_token],
        )
        .await?;
    Ok(affected > 0)
}

/// Logical delete of the session matching a refresh token (logout).
pub async fn deactivate_by_refresh_token(pool: &Pool, refresh_token: &str) -> Result<bool> {
    let client = pool.get().await?;
    let affected = client
        .execute(
            r#"
            UPDATE sessions
            SET is_active = FALSE,
                last_activity_at = NOW()
            WHERE refresh_token = $1
              AND is_active = TRUE
            "#,
            &[&refresh_token],
        )
        .await?;
    Ok(affected > 0)
}

/// Deactivates every active session for a user (logout-all). Returns the count.
pub async fn deactivate_all_for_user(pool: &Pool, user_id: &str) -> Result<u64> {
    let client = pool.get().await?;
    let affected = client
        .execute(
            r#"
            UPDATE sessions
            SET is_active = FALSE,
                last_activity_at = NOW()
            WHERE user_id = $1
              AND is_active = TRUE
            "#,
            &[&user_id],
        )
        .await?;
    Ok(affected)
}

/// Deactivates one session, only when owned by the given user.
///
/// The ownership check lives in the WHERE clause so a mismatched caller sees
/// the same "no rows" outcome as a nonexistent id.
pub async fn deactivate_by_id(pool: &Pool, session_id: &str, user_id: &str) -> Result<bool> {
    let client = pool.get().await?;
    let affected = client
        .execute(
            r#"
            UPDATE sessions
            SET is_active = FALSE,
                last_activity_at = NOW()
            WHERE id = $1
              AND user_id = $2
              AND is_active = TRUE
            "#,
            &[&session_id, &user_id],
        )
        .await?;
    Ok(affected > 0)
}

/// All active, unexpired sessions for a user, most recently used first.
pub async fn list_active_for_user(pool: &Pool, user_id: &str) -> Result<Vec<Session>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT id, user_id, account_id, session_token, refresh_token,
                   device_type, ip_address, user_agent, is_active,
                   expires_at, created_at, last_activity_at
            FROM sessions
            WHERE user_id = $1
              AND is_active = TRUE
              AND expires_at > NOW()
            ORDER BY last_activity_at DESC
            "#,
            &[&user_id],
        )
        .await?;
    rows.iter().map(row_to_session).collect()
}

/// Physically deletes sessions that are past expiry, or deactivated and idle
/// for 30+ days. Run by the background reaper.
pub async fn delete_expired(pool: &Pool) -> Result<u64> {
    let client = pool.get().await?;
    let deleted = client
        .execute(
            r#"
            DELETE FROM sessions
            WHERE expires_at < NOW()
               OR (is_active = FALSE AND last_activity_at < NOW() - INTERVAL '30 days')
            "#,
            &[],
        )
        .await?;
    Ok(deleted)
}
