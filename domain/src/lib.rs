use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default trailing window for the balance trend, in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("transaction {id} has malformed date {value:?}")]
    InvalidDate { id: String, value: String },
    #[error("transaction {id} has a non-finite amount")]
    NonFiniteAmount { id: String },
    #[error("current total must be a finite number")]
    NonFiniteTotal,
}

/// A validated transaction as consumed by the balance projector.
///
/// Positive amounts leave the account (debits), negative amounts enter it
/// (credits).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub amount: f64,
}

/// Transaction as it arrives over the wire, before date validation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RawTransaction {
    pub id: String,
    pub date: String,
    pub amount: f64,
}

impl TryFrom<&RawTransaction> for Transaction {
    type Error = ValidationError;

    fn try_from(raw: &RawTransaction) -> Result<Self, Self::Error> {
        validated(&raw.id, &raw.date, raw.amount)
    }
}

/// Row of the `transactions` table.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoredTransaction {
    pub id: String,
    pub item_id: String,
    pub account_id: String,
    pub name: String,
    pub amount: f64,
    pub date: String,
    pub categories: Option<String>,
}

impl StoredTransaction {
    /// Human readable category path, e.g. `Food and Drink > Restaurants`.
    pub fn category_path(&self) -> String {
        self.categories
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
            .filter(|parts| !parts.is_empty())
            .map(|parts| parts.join(" > "))
            .unwrap_or_else(|| "Uncategorized".to_string())
    }
}

impl TryFrom<&StoredTransaction> for Transaction {
    type Error = ValidationError;

    fn try_from(row: &StoredTransaction) -> Result<Self, Self::Error> {
        validated(&row.id, &row.date, row.amount)
    }
}

fn validated(id: &str, date: &str, amount: f64) -> Result<Transaction, ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::NonFiniteAmount { id: id.to_string() });
    }
    let date = parse_transaction_date(date).ok_or_else(|| ValidationError::InvalidDate {
        id: id.to_string(),
        value: date.to_string(),
    })?;
    Ok(Transaction {
        id: id.to_string(),
        date,
        amount,
    })
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (its calendar date is kept
/// as written, no timezone shift).
pub fn parse_transaction_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|ts| ts.date_naive())
        })
}

/// One day of the reconstructed balance series.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BalanceSnapshot {
    pub date: NaiveDate,
    pub balance: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrendSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_balance: f64,
    pub end_balance: f64,
    pub net_change: f64,
    pub highest_balance: f64,
    pub lowest_balance: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Item {
    pub id: String,
    pub access_token: String,
    pub next_cursor: Option<String>,
}

impl Item {
    /// Items without a usable token cannot be queried upstream.
    pub fn has_access_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Balances {
    pub available: Option<f64>,
    pub current: Option<f64>,
    pub iso_currency_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AccountBalance {
    pub account_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    pub balances: Balances,
}

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub item_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TrendRequest {
    pub item_id: String,
    pub window_days: Option<u32>,
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectRequest {
    pub transactions: Vec<RawTransaction>,
    pub current_total: f64,
    pub window_days: Option<u32>,
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectResponse {
    pub snapshots: Vec<BalanceSnapshot>,
    pub summary: Option<TrendSummary>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BalanceReport {
    pub accounts: Vec<AccountBalance>,
    pub total: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    #[serde(rename = "Balance")]
    pub balance: BalanceReport,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<StoredTransaction>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BalanceTrend {
    pub item_id: String,
    pub as_of: NaiveDate,
    pub window_days: u32,
    pub current_total: f64,
    pub snapshots: Vec<BalanceSnapshot>,
    pub summary: Option<TrendSummary>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecentTransaction {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub date: String,
    pub category: String,
}

impl From<&StoredTransaction> for RecentTransaction {
    fn from(row: &StoredTransaction) -> Self {
        Self {
            id: row.id.clone(),
            name: row.name.clone(),
            amount: row.amount,
            date: row.date.clone(),
            category: row.category_path(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Dashboard {
    pub total_balance: f64,
    pub accounts: Vec<AccountBalance>,
    pub trend: BalanceTrend,
    pub recent_transactions: Vec<RecentTransaction>,
}
