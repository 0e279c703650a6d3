//! Deny-list of token ids (`jti`) that were invalidated before they expired.
//!
//! Rows live in Postgres so a logout holds across restarts and across every
//! instance sharing the database. Each row keeps the token's own expiry; once
//! that passes the token is rejected anyway and the row can be purged.

use chrono::{DateTime, Utc};

use crate::{db::DbPool, error::AppResult};

pub async fn revoke(pool: &DbPool, jti: &str, expires_at: DateTime<Utc>) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO catalog.revoked_tokens (jti, expires_at)
        VALUES ($1, $2)
        ON CONFLICT (jti) DO NOTHING
        "#,
    )
    .bind(jti)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn is_revoked(pool: &DbPool, jti: &str) -> AppResult<bool> {
    let revoked: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM catalog.revoked_tokens WHERE jti = $1)",
    )
    .bind(jti)
    .fetch_one(pool)
    .await?;

    Ok(revoked)
}

/// Drops entries whose token has expired on its own. Returns the number removed.
pub async fn purge_expired(pool: &DbPool) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM catalog.revoked_tokens WHERE expires_at < NOW()")
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
