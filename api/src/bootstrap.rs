use std::sync::Arc;

use anyhow::Result;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    config::AppConfig,
    repositories::{
        PostgresBalanceCacheRepository, PostgresItemRepository, PostgresTransactionRepository,
    },
    services::{BalanceRefresher, CachedBalanceSource, PlaidBalanceSource},
    state::AppState,
};

pub async fn connect_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    sqlx::migrate!("../migrations").run(&pool).await?;
    Ok(pool)
}

pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let pool = connect_pool(&config.database_url).await?;

    let item_repo = Arc::new(PostgresItemRepository::new(pool.clone()));
    let transaction_repo = Arc::new(PostgresTransactionRepository::new(pool.clone()));
    let balance_cache_repo = Arc::new(PostgresBalanceCacheRepository::new(pool.clone()));

    tracing::info!(
        environment = ?config.plaid.environment,
        api_base = %config.plaid.api_base,
        "configuring aggregator client"
    );
    let plaid = Arc::new(PlaidBalanceSource::new(config.plaid.clone()));
    let balances = Arc::new(CachedBalanceSource::new(
        plaid,
        balance_cache_repo.clone(),
        config.balance_cache_ttl,
    ));

    if config.enable_balance_refresher {
        let refresher = Arc::new(BalanceRefresher::new(
            balances.clone(),
            item_repo.clone(),
            config.balance_refresh_interval,
        ));
        refresher.spawn();
    }

    Ok(AppState {
        config: config.clone(),
        db: pool,
        balances,
        item_repo,
        transaction_repo,
        balance_cache_repo,
    })
}
