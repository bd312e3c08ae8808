use anyhow::Result;
use async_trait::async_trait;
use domain::StoredTransaction;
use sqlx::{PgPool, Row};

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// All transactions of an item, newest date first.
    async fn list_by_item(&self, item_id: &str) -> Result<Vec<StoredTransaction>>;
    /// Inserts rows, skipping ids that are already stored.
    async fn insert_transactions(&self, txs: &[StoredTransaction]) -> Result<()>;
}

#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn list_by_item(&self, item_id: &str) -> Result<Vec<StoredTransaction>> {
        let rows = sqlx::query(
            "SELECT id, item_id, account_id, name, amount, date, categories
             FROM transactions
             WHERE item_id = $1
             ORDER BY date DESC, id",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(StoredTransaction {
                    id: row.try_get("id")?,
                    item_id: row.try_get("item_id")?,
                    account_id: row.try_get("account_id")?,
                    name: row.try_get("name")?,
                    amount: row.try_get("amount")?,
                    date: row.try_get("date")?,
                    categories: row.try_get("categories")?,
                })
            })
            .collect()
    }

    async fn insert_transactions(&self, txs: &[StoredTransaction]) -> Result<()> {
        if txs.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for t in txs {
            sqlx::query(
                "INSERT INTO transactions (id, item_id, account_id, name, amount, date, categories)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(&t.id)
            .bind(&t.item_id)
            .bind(&t.account_id)
            .bind(&t.name)
            .bind(t.amount)
            .bind(&t.date)
            .bind(&t.categories)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
