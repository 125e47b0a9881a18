use crate::error::Result;
use crate::models::account::{Account, AccountType, AccountWithUser};
use deadpool_postgres::{Pool, Transaction};
use tokio_postgres::Row;

fn row_to_account(row: &Row) -> Result<Account> {
    Ok(Account {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        account_type: AccountType::from_str(row.try_get("account_type")?)?,
        identifier: row.try_get("identifier")?,
        is_verified: row.try_get("is_verified")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Inserts a credential account inside the registration transaction.
///
/// The UNIQUE constraint on `identifier` backs the system-wide uniqueness
/// invariant; a violation converts to `Conflict` at the error boundary.
pub async fn insert_account(
    tx: &Transaction<'_>,
    id: &str,
    user_id: &str,
    account_type: AccountType,
    identifier: &str,
    password_hash: &str,
) -> Result<Account> {
    let row = tx
        .query_one(
            r#"
            INSERT INTO accounts (
                id, user_id, account_type, identifier, password_hash,
                is_verified, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, FALSE, NOW(), NOW())
            RETURNING id, user_id, account_type, identifier, is_verified, created_at
            "#,
            &[
                &id,
                &user_id,
                &account_type.as_str(),
                &identifier,
                &password_hash,
            ],
        )
        .await?;
    row_to_account(&row)
}

/// Finds an account by login identifier, joined with its owning user.
///
/// One query serves both the credential check and the profile returned on
/// successful login.
pub async fn find_by_identifier_with_user(
    pool: &Pool,
    identifier: &str,
) -> Result<Option<AccountWithUser>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT
                a.id,
                a.user_id,
                a.identifier,
                a.password_hash,
                a.account_type,
                a.is_verified,
                u.full_name,
                u.email,
                u.phone,
                u.role,
                u.is_active AS user_is_active
            FROM accounts a
            INNER JOIN users u ON a.user_id = u.id
            WHERE a.identifier = $1
            LIMIT 1
            "#,
            &[&identifier],
        )
        .await?;

    row.map(|r| {
        Ok(AccountWithUser {
            id: r.try_get("id")?,
            user_id: r.try_get("user_id")?,
            identifier: r.try_get("identifier")?,
            password_hash: r.try_get("password_hash")?,
            account_type: AccountType::from_str(r.try_get("account_type")?)?,
            is_verified: r.try_get("is_verified")?,
            full_name: r.try_get("full_name")?,
            email: r.try_get("email")?,
            phone: r.try_get("phone")?,
            role: r.try_get("role")?,
            user_is_active: r.try_get("user_is_active")?,
        })
    })
    .transpose()
}
