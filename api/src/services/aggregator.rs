use std::{collections::HashMap, sync::Arc, time::Duration, time::Instant};

use async_trait::async_trait;
use chrono::Utc;
use domain::{AccountBalance, Item};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{config::PlaidConfig, repositories::BalanceCacheRepository};

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("aggregator request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("aggregator returned status {status}: {code} {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("unexpected aggregator response: {0}")]
    Decode(String),
    #[error("access token not recognised")]
    UnknownAccessToken,
}

/// Source of live account balances for a linked item.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn accounts_balance(&self, item: &Item) -> Result<Vec<AccountBalance>, AggregatorError>;
}

#[derive(Debug, Deserialize)]
struct BalanceGetResponse {
    accounts: Vec<AccountBalance>,
}

#[derive(Debug, Default, Deserialize)]
struct PlaidErrorBody {
    error_code: Option<String>,
    error_message: Option<String>,
}

/// Calls Plaid's `/accounts/balance/get`.
#[derive(Clone)]
pub struct PlaidBalanceSource {
    client: Client,
    config: PlaidConfig,
}

impl PlaidBalanceSource {
    pub fn new(config: PlaidConfig) -> Self {
        Self {
            client: Client::new(),
            config: PlaidConfig {
                api_base: config.api_base.trim_end_matches('/').to_string(),
                ..config
            },
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base, path)
    }
}

#[async_trait]
impl BalanceSource for PlaidBalanceSource {
    async fn accounts_balance(&self, item: &Item) -> Result<Vec<AccountBalance>, AggregatorError> {
        let started = Instant::now();
        let resp = self
            .client
            .post(self.endpoint("/accounts/balance/get"))
            .header("Plaid-Version", self.config.version.as_str())
            .json(&json!({
                "client_id": self.config.client_id,
                "secret": self.config.secret,
                "access_token": item.access_token,
            }))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        metrics::histogram!("aggregator_request_seconds", "endpoint" => "accounts_balance")
            .record(started.elapsed().as_secs_f64());

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        parse_balance_response(&body)
    }
}

fn parse_balance_response(body: &[u8]) -> Result<Vec<AccountBalance>, AggregatorError> {
    serde_json::from_slice::<BalanceGetResponse>(body)
        .map(|parsed| parsed.accounts)
        .map_err(|err| AggregatorError::Decode(err.to_string()))
}

fn api_error(status: u16, body: &[u8]) -> AggregatorError {
    let parsed: PlaidErrorBody = serde_json::from_slice(body).unwrap_or_default();
    AggregatorError::Api {
        status,
        code: parsed.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
        message: parsed.error_message.unwrap_or_default(),
    }
}

/// Fixed balances keyed by access token. Used by tests and offline demos.
#[derive(Clone, Default)]
pub struct StaticBalanceSource {
    accounts: HashMap<String, Vec<AccountBalance>>,
}

impl StaticBalanceSource {
    pub fn new(accounts: HashMap<String, Vec<AccountBalance>>) -> Self {
        Self { accounts }
    }

    pub fn with_item(mut self, access_token: &str, accounts: Vec<AccountBalance>) -> Self {
        self.accounts.insert(access_token.to_string(), accounts);
        self
    }
}

#[async_trait]
impl BalanceSource for StaticBalanceSource {
    async fn accounts_balance(&self, item: &Item) -> Result<Vec<AccountBalance>, AggregatorError> {
        self.accounts
            .get(&item.access_token)
            .cloned()
            .ok_or(AggregatorError::UnknownAccessToken)
    }
}

/// Serves balances from the cache table while fresh and refreshes them from
/// the inner source otherwise. A stale entry is returned when the inner
/// source fails.
pub struct CachedBalanceSource<S> {
    inner: Arc<S>,
    cache_repo: Arc<dyn BalanceCacheRepository>,
    ttl: Duration,
}

impl<S> CachedBalanceSource<S>
where
    S: BalanceSource,
{
    pub fn new(inner: Arc<S>, cache_repo: Arc<dyn BalanceCacheRepository>, ttl: Duration) -> Self {
        Self {
            inner,
            cache_repo,
            ttl,
        }
    }

    /// Bypasses the fresh-cache check and stores whatever the inner source
    /// returns.
    pub async fn refresh(&self, item: &Item) -> Result<Vec<AccountBalance>, AggregatorError> {
        let accounts = self.inner.accounts_balance(item).await?;
        let ttl_seconds = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        if let Err(err) = self
            .cache_repo
            .upsert(&item.id, &accounts, ttl_seconds)
            .await
        {
            warn!(error = %err, item_id = %item.id, "failed to store balance cache entry");
        }
        Ok(accounts)
    }
}

#[async_trait]
impl<S> BalanceSource for CachedBalanceSource<S>
where
    S: BalanceSource + 'static,
{
    async fn accounts_balance(&self, item: &Item) -> Result<Vec<AccountBalance>, AggregatorError> {
        match self.cache_repo.get_cached(&item.id, Utc::now()).await {
            Ok(Some(accounts)) => {
                metrics::counter!("balance_cache_total", "outcome" => "hit").increment(1);
                return Ok(accounts);
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, item_id = %item.id, "balance cache lookup failed"),
        }
        metrics::counter!("balance_cache_total", "outcome" => "miss").increment(1);

        match self.refresh(item).await {
            Ok(accounts) => Ok(accounts),
            Err(err) => match self.cache_repo.get_any(&item.id).await {
                Ok(Some(stale)) => {
                    debug!(error = %err, item_id = %item.id, "serving stale balances");
                    Ok(stale)
                }
                Ok(None) => Err(err),
                Err(cache_err) => {
                    warn!(error = %cache_err, item_id = %item.id, "stale balance lookup failed");
                    Err(err)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_accounts_from_balance_payload() {
        let body = br#"{
            "accounts": [
                {"account_id": "a1", "name": "Checking", "type": "depository", "subtype": "checking",
                 "balances": {"available": 100, "current": 110, "iso_currency_code": "USD"}},
                {"account_id": "a2", "name": "Credit Card", "type": "credit", "subtype": "credit card",
                 "balances": {"available": null, "current": 410, "iso_currency_code": "USD"}}
            ],
            "item": {"item_id": "item-1"},
            "request_id": "req-1"
        }"#;
        let accounts = parse_balance_response(body).expect("should parse");
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].balances.current, Some(110.0));
        assert_eq!(accounts[1].balances.available, None);
    }

    #[test]
    fn missing_accounts_is_a_decode_error() {
        assert!(matches!(
            parse_balance_response(br#"{"request_id": "req-2"}"#),
            Err(AggregatorError::Decode(_))
        ));
    }

    #[test]
    fn api_error_keeps_plaid_code() {
        let body = br#"{"error_type": "ITEM_ERROR", "error_code": "ITEM_LOGIN_REQUIRED",
                        "error_message": "the login details of this item have changed"}"#;
        match api_error(400, body) {
            AggregatorError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, "ITEM_LOGIN_REQUIRED");
                assert!(message.contains("login details"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(
            api_error(500, b"<html>"),
            AggregatorError::Api { ref code, .. } if code == "UNKNOWN"
        ));
    }

    fn item(access_token: &str) -> Item {
        Item {
            id: format!("item-{access_token}"),
            access_token: access_token.to_string(),
            next_cursor: None,
        }
    }

    #[tokio::test]
    async fn static_source_rejects_unknown_tokens() {
        let source = StaticBalanceSource::default().with_item("access-1", Vec::new());
        assert!(source.accounts_balance(&item("access-1")).await.is_ok());
        assert!(matches!(
            source.accounts_balance(&item("access-2")).await,
            Err(AggregatorError::UnknownAccessToken)
        ));
    }

    struct UnreachableCache;

    #[async_trait]
    impl BalanceCacheRepository for UnreachableCache {
        async fn get_cached(
            &self,
            _item_id: &str,
            _now: chrono::DateTime<Utc>,
        ) -> anyhow::Result<Option<Vec<AccountBalance>>> {
            Err(anyhow::anyhow!("cache unavailable"))
        }

        async fn get_any(&self, _item_id: &str) -> anyhow::Result<Option<Vec<AccountBalance>>> {
            Err(anyhow::anyhow!("cache unavailable"))
        }

        async fn upsert(
            &self,
            _item_id: &str,
            _accounts: &[AccountBalance],
            _ttl_seconds: i64,
        ) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("cache unavailable"))
        }
    }

    #[tokio::test]
    async fn broken_cache_does_not_hide_upstream_result() {
        let inner = StaticBalanceSource::default().with_item("access-1", Vec::new());
        let source = CachedBalanceSource::new(
            Arc::new(inner),
            Arc::new(UnreachableCache),
            Duration::from_secs(60),
        );

        assert!(source.accounts_balance(&item("access-1")).await.is_ok());
        assert!(matches!(
            source.accounts_balance(&item("access-2")).await,
            Err(AggregatorError::UnknownAccessToken)
        ));
    }
}
