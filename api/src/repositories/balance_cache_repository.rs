use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::AccountBalance;
use sqlx::{PgPool, Row, types::Json};

#[async_trait]
pub trait BalanceCacheRepository: Send + Sync {
    /// Cached accounts for an item, only while the entry has not expired.
    async fn get_cached(
        &self,
        item_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<AccountBalance>>>;
    /// Cached accounts regardless of expiry.
    async fn get_any(&self, item_id: &str) -> Result<Option<Vec<AccountBalance>>>;
    async fn upsert(
        &self,
        item_id: &str,
        accounts: &[AccountBalance],
        ttl_seconds: i64,
    ) -> Result<()>;
}

#[derive(Clone)]
pub struct PostgresBalanceCacheRepository {
    pool: PgPool,
}

impl PostgresBalanceCacheRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BalanceCacheRepository for PostgresBalanceCacheRepository {
    async fn get_cached(
        &self,
        item_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<AccountBalance>>> {
        let row =
            sqlx::query("SELECT accounts FROM balance_cache WHERE item_id = $1 AND expires_at > $2")
                .bind(item_id)
                .bind(now)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|r| {
            r.try_get::<Json<Vec<AccountBalance>>, _>("accounts")
                .map(|json| json.0)
                .map_err(Into::into)
        })
        .transpose()
    }

    async fn get_any(&self, item_id: &str) -> Result<Option<Vec<AccountBalance>>> {
        let row = sqlx::query("SELECT accounts FROM balance_cache WHERE item_id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| {
            r.try_get::<Json<Vec<AccountBalance>>, _>("accounts")
                .map(|json| json.0)
                .map_err(Into::into)
        })
        .transpose()
    }

    async fn upsert(
        &self,
        item_id: &str,
        accounts: &[AccountBalance],
        ttl_seconds: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO balance_cache (item_id, accounts, fetched_at, expires_at)
             VALUES ($1, $2, NOW(), NOW() + ($3 || ' seconds')::interval)
             ON CONFLICT (item_id) DO UPDATE
             SET accounts = EXCLUDED.accounts,
                 fetched_at = NOW(),
                 expires_at = EXCLUDED.expires_at",
        )
        .bind(item_id)
        .bind(Json(accounts))
        .bind(ttl_seconds.max(1))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
