use balance_engine::{project, summarize, total_balance};
use chrono::{NaiveDate, Utc};
use domain::{
    BalanceReport, BalanceTrend, Dashboard, Item, RecentTransaction, StoredTransaction,
    Transaction, ValidationError,
};
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Looks up an item and makes sure it carries an access token.
pub async fn load_item(state: &AppState, item_id: &str) -> ApiResult<Item> {
    let item = state
        .item_repo
        .find_by_id(item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(item_id.to_string()))?;
    if !item.has_access_token() {
        return Err(ApiError::MissingAccessToken);
    }
    Ok(item)
}

pub async fn fetch_balance(state: &AppState, item: &Item) -> ApiResult<BalanceReport> {
    let accounts = state.balances.accounts_balance(item).await?;
    let total = total_balance(&accounts);
    Ok(BalanceReport { accounts, total })
}

pub async fn build_trend(
    state: &AppState,
    item_id: &str,
    window_days: Option<u32>,
    as_of: Option<NaiveDate>,
) -> ApiResult<BalanceTrend> {
    let (trend, _, _) = load_trend(state, item_id, window_days, as_of).await?;
    Ok(trend)
}

pub async fn build_dashboard(
    state: &AppState,
    item_id: &str,
    window_days: Option<u32>,
    as_of: Option<NaiveDate>,
) -> ApiResult<Dashboard> {
    let (trend, balance, rows) = load_trend(state, item_id, window_days, as_of).await?;
    Ok(Dashboard {
        total_balance: balance.total,
        accounts: balance.accounts,
        trend,
        recent_transactions: recent_transactions(&rows, state.config.recent_transactions_limit),
    })
}

async fn load_trend(
    state: &AppState,
    item_id: &str,
    window_days: Option<u32>,
    as_of: Option<NaiveDate>,
) -> ApiResult<(BalanceTrend, BalanceReport, Vec<StoredTransaction>)> {
    let item = load_item(state, item_id).await?;
    let balance = fetch_balance(state, &item).await?;
    let rows = state.transaction_repo.list_by_item(&item.id).await?;
    let transactions = validate_rows(&rows)?;

    let window_days = state.config.window_days(window_days);
    let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
    let trend = assemble_trend(&item.id, &transactions, balance.total, window_days, as_of);
    debug!(
        item_id = %item.id,
        transactions = transactions.len(),
        points = trend.snapshots.len(),
        "balance trend computed"
    );
    Ok((trend, balance, rows))
}

/// Converts stored rows into projector input, failing on the first
/// malformed row.
pub fn validate_rows(rows: &[StoredTransaction]) -> Result<Vec<Transaction>, ValidationError> {
    rows.iter().map(Transaction::try_from).collect()
}

pub fn assemble_trend(
    item_id: &str,
    transactions: &[Transaction],
    current_total: f64,
    window_days: u32,
    as_of: NaiveDate,
) -> BalanceTrend {
    let snapshots = project(transactions, current_total, window_days, as_of);
    metrics::counter!("balance_projections_total").increment(1);
    BalanceTrend {
        item_id: item_id.to_string(),
        as_of,
        window_days,
        current_total,
        summary: summarize(&snapshots),
        snapshots,
    }
}

/// First `limit` rows; callers pass rows already ordered newest first.
pub fn recent_transactions(rows: &[StoredTransaction], limit: usize) -> Vec<RecentTransaction> {
    rows.iter().take(limit).map(RecentTransaction::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, date: &str, amount: f64) -> StoredTransaction {
        StoredTransaction {
            id: id.to_string(),
            item_id: "item-1".to_string(),
            account_id: "acc-1".to_string(),
            name: format!("merchant {id}"),
            amount,
            date: date.to_string(),
            categories: None,
        }
    }

    #[test]
    fn validate_rows_reports_the_bad_row() {
        let rows = vec![row("a", "2024-01-09", 1.0), row("b", "2024/01/10", 2.0)];
        match validate_rows(&rows) {
            Err(ValidationError::InvalidDate { id, .. }) => assert_eq!(id, "b"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn assembled_trend_carries_summary() {
        let rows = vec![row("t2", "2024-01-10", -5.0), row("t1", "2024-01-09", 20.0)];
        let transactions = validate_rows(&rows).expect("valid rows");
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let trend = assemble_trend("item-1", &transactions, 100.0, 2, as_of);
        let balances: Vec<f64> = trend.snapshots.iter().map(|s| s.balance).collect();
        assert_eq!(balances, vec![115.0, 95.0, 100.0]);
        assert_eq!(trend.summary.map(|s| s.net_change), Some(-15.0));
    }

    #[test]
    fn empty_history_has_no_summary() {
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let trend = assemble_trend("item-1", &[], 500.0, 30, as_of);
        assert!(trend.snapshots.is_empty());
        assert!(trend.summary.is_none());
        assert_eq!(trend.current_total, 500.0);
    }

    #[test]
    fn recent_transactions_respects_limit() {
        let rows: Vec<_> = (0..15)
            .map(|i| row(&format!("t{i}"), "2024-01-09", f64::from(i)))
            .collect();
        let recent = recent_transactions(&rows, 10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].id, "t0");
        assert_eq!(recent[0].category, "Uncategorized");
    }
}
