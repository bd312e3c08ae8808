use sqlx::PgPool;
use std::sync::Arc;

use crate::{
    config::AppConfig,
    repositories::{BalanceCacheRepository, ItemRepository, TransactionRepository},
    services::BalanceSource,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: PgPool,
    pub balances: Arc<dyn BalanceSource>,
    pub item_repo: Arc<dyn ItemRepository>,
    pub transaction_repo: Arc<dyn TransactionRepository>,
    pub balance_cache_repo: Arc<dyn BalanceCacheRepository>,
}

// Ensure critical dependencies uphold Send/Sync for Axum state usage.
#[allow(dead_code)]
fn _assert_state_types_are_send_sync()
where
    AppConfig: Send + Sync + 'static,
    PgPool: Send + Sync + 'static,
    dyn BalanceSource: Send + Sync,
    dyn ItemRepository: Send + Sync,
    dyn TransactionRepository: Send + Sync,
    dyn BalanceCacheRepository: Send + Sync,
{
}

#[allow(dead_code)]
fn _assert_state_bounds() {
    fn assert_bounds<T: Clone + Send + Sync + 'static>() {}
    assert_bounds::<AppState>();
}
