use anyhow::Result;
use async_trait::async_trait;
use domain::Item;
use sqlx::{PgPool, Row};

#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn find_by_id(&self, item_id: &str) -> Result<Option<Item>>;
    async fn list_all(&self) -> Result<Vec<Item>>;
    async fn upsert_item(&self, item: &Item) -> Result<()>;
}

#[derive(Clone)]
pub struct PostgresItemRepository {
    pool: PgPool,
}

impl PostgresItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_item(row: &sqlx::postgres::PgRow) -> Result<Item> {
        Ok(Item {
            id: row.try_get("id")?,
            access_token: row.try_get("access_token")?,
            next_cursor: row.try_get("next_cursor")?,
        })
    }
}

#[async_trait]
impl ItemRepository for PostgresItemRepository {
    async fn find_by_id(&self, item_id: &str) -> Result<Option<Item>> {
        let row = sqlx::query("SELECT id, access_token, next_cursor FROM items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Item>> {
        let rows = sqlx::query("SELECT id, access_token, next_cursor FROM items ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_item).collect()
    }

    async fn upsert_item(&self, item: &Item) -> Result<()> {
        sqlx::query(
            "INSERT INTO items (id, access_token, next_cursor)
             VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE
             SET access_token = EXCLUDED.access_token,
                 next_cursor = EXCLUDED.next_cursor",
        )
        .bind(&item.id)
        .bind(&item.access_token)
        .bind(&item.next_cursor)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
