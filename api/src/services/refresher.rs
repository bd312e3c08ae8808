use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    repositories::ItemRepository,
    services::aggregator::{BalanceSource, CachedBalanceSource},
};

/// Periodically pulls fresh balances for every stored item so dashboard
/// requests are served from the cache.
pub struct BalanceRefresher<S>
where
    S: BalanceSource + 'static,
{
    source: Arc<CachedBalanceSource<S>>,
    item_repo: Arc<dyn ItemRepository>,
    interval: Duration,
}

impl<S> BalanceRefresher<S>
where
    S: BalanceSource + 'static,
{
    pub fn new(
        source: Arc<CachedBalanceSource<S>>,
        item_repo: Arc<dyn ItemRepository>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            item_repo,
            interval: interval.max(Duration::from_secs(30)),
        }
    }

    pub fn spawn(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                if let Err(err) = self.run_once().await {
                    warn!(error = %err, "balance refresh run failed");
                }
                sleep(self.interval).await;
            }
        });
    }

    /// Refreshes every item that has an access token; returns how many
    /// succeeded.
    pub async fn run_once(&self) -> Result<usize> {
        let items = self.item_repo.list_all().await?;
        let mut refreshed = 0;
        for item in &items {
            if !item.has_access_token() {
                debug!(item_id = %item.id, "skipping item without access token");
                continue;
            }
            match self.source.refresh(item).await {
                Ok(_) => refreshed += 1,
                Err(err) => warn!(error = %err, item_id = %item.id, "balance refresh failed"),
            }
        }
        info!(items = items.len(), refreshed, "balance refresh complete");
        metrics::counter!("balance_refresh_items_total").increment(refreshed as u64);
        Ok(refreshed)
    }
}
