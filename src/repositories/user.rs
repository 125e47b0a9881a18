use crate::error::Result;
use crate::models::user::User;
use deadpool_postgres::{Pool, Transaction};
use tokio_postgres::Row;

/// Maps a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        phone: row.try_get("phone")?,
        role: row.try_get("role")?,
        is_active: row.try_get("is_active")?,
        is_blocked: row.try_get("is_blocked")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Inserts a user profile inside the registration transaction.
pub async fn insert_user(
    tx: &Transaction<'_>,
    id: &str,
    email: &str,
    full_name: &str,
    phone: &str,
    role: &str,
) -> Result<User> {
    let row = tx
        .query_one(
            r#"
            INSERT INTO users (id, email, full_name, phone, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING id, email, full_name, phone, role, is_active, is_blocked,
                      created_at, updated_at
            "#,
            &[&id, &email, &full_name, &phone, &role],
        )
        .await?;
    row_to_user(&row)
}

/// Finds a user by id.
pub async fn find_by_id(pool: &Pool, user_id: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT id, email, full_name, phone, role, is_active, is_blocked,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            LIMIT 1
            "#,
            &[&user_id],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}
