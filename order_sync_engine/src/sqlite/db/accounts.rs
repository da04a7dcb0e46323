use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{Account, NewAccount, TokenUpdate};

pub async fn fetch_enabled_accounts(conn: &mut SqliteConnection) -> Result<Vec<Account>, sqlx::Error> {
    let accounts = sqlx::query_as("SELECT * FROM accounts WHERE enabled = TRUE ORDER BY id").fetch_all(conn).await?;
    Ok(accounts)
}

pub async fn fetch_account_by_shop_id(
    shop_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Account>, sqlx::Error> {
    let account =
        sqlx::query_as("SELECT * FROM accounts WHERE shop_id = $1").bind(shop_id).fetch_optional(conn).await?;
    Ok(account)
}

pub async fn insert_account(account: NewAccount, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
            INSERT INTO accounts (
                shop_id,
                name,
                access_token,
                refresh_token,
                expires_in,
                token_issued_at,
                initial_sync_start
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id;
        "#,
    )
    .bind(account.shop_id)
    .bind(account.name)
    .bind(account.access_token)
    .bind(account.refresh_token)
    .bind(account.expires_in)
    .bind(account.token_issued_at)
    .bind(account.initial_sync_start)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Account inserted with id {id}");
    Ok(id)
}

/// Persist a freshly rotated token pair for the account.
pub async fn update_tokens(
    shop_id: &str,
    update: &TokenUpdate,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE accounts SET
              access_token = $1,
              refresh_token = $2,
              expires_in = $3,
              token_issued_at = $4,
              updated_at = CURRENT_TIMESTAMP
            WHERE shop_id = $5
        "#,
    )
    .bind(&update.access_token)
    .bind(&update.refresh_token)
    .bind(update.expires_in)
    .bind(update.issued_at)
    .bind(shop_id)
    .execute(conn)
    .await?;
    debug!("📝️ Tokens updated for shop {shop_id}");
    Ok(())
}

/// Advance the sync watermarks. `None` leaves the corresponding column untouched, so a
/// modified-only pass never rolls back the new-orders watermark.
pub async fn update_watermarks(
    shop_id: &str,
    last_new_sync: Option<DateTime<Utc>>,
    last_modified_sync: Option<DateTime<Utc>>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE accounts SET
              last_new_sync = COALESCE($1, last_new_sync),
              last_modified_sync = COALESCE($2, last_modified_sync),
              updated_at = CURRENT_TIMESTAMP
            WHERE shop_id = $3
        "#,
    )
    .bind(last_new_sync)
    .bind(last_modified_sync)
    .bind(shop_id)
    .execute(conn)
    .await?;
    Ok(())
}
