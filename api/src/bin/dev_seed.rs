use std::env;

use anyhow::{Context, Result};
use api::{
    bootstrap::connect_pool,
    repositories::{
        BalanceCacheRepository, ItemRepository, PostgresBalanceCacheRepository,
        PostgresItemRepository, PostgresTransactionRepository, TransactionRepository,
    },
    telemetry,
};
use chrono::{Datelike, Days, NaiveDate, Utc};
use domain::{AccountBalance, Balances, Item, StoredTransaction};
use serde_json::json;

const DEV_ITEM_ID: &str = "item-dev-sandbox";
const DEV_ACCOUNT_ID: &str = "acc-dev-checking";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing(telemetry::CLI_FILTER)?;
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let pool = connect_pool(&database_url).await?;

    let access_token = env::var("DEV_SEED_ACCESS_TOKEN")
        .unwrap_or_else(|_| "access-sandbox-dev-seed".to_string());
    let current_balance: f64 = env::var("DEV_SEED_BALANCE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(2_450.75);

    let item = Item {
        id: DEV_ITEM_ID.to_string(),
        access_token,
        next_cursor: None,
    };
    PostgresItemRepository::new(pool.clone())
        .upsert_item(&item)
        .await?;

    let today = Utc::now().date_naive();
    let transactions = demo_transactions(today);
    PostgresTransactionRepository::new(pool.clone())
        .insert_transactions(&transactions)
        .await?;

    // a long-lived cache entry lets the dashboard render without aggregator credentials
    let accounts = vec![AccountBalance {
        account_id: DEV_ACCOUNT_ID.to_string(),
        name: "Dev Checking".to_string(),
        account_type: Some("depository".to_string()),
        subtype: Some("checking".to_string()),
        balances: Balances {
            available: Some(current_balance),
            current: Some(current_balance),
            iso_currency_code: Some("USD".to_string()),
        },
    }];
    PostgresBalanceCacheRepository::new(pool)
        .upsert(&item.id, &accounts, 30 * 24 * 3600)
        .await?;

    println!(
        "Seeded item {} with {} transactions (dev only).",
        item.id,
        transactions.len()
    );
    Ok(())
}

/// 45 days of deterministic activity: biweekly payroll, weekly groceries,
/// a coffee most weekdays and rent on the first of the month.
fn demo_transactions(today: NaiveDate) -> Vec<StoredTransaction> {
    let mut rows = Vec::new();
    for days_ago in 0..45_u64 {
        let Some(date) = today.checked_sub_days(Days::new(days_ago)) else {
            break;
        };
        let mut push = |suffix: &str, name: &str, amount: f64, categories: &[&str]| {
            rows.push(StoredTransaction {
                id: format!("dev-{date}-{suffix}"),
                item_id: DEV_ITEM_ID.to_string(),
                account_id: DEV_ACCOUNT_ID.to_string(),
                name: name.to_string(),
                amount,
                date: date.format("%Y-%m-%d").to_string(),
                categories: Some(json!(categories).to_string()),
            });
        };
        if days_ago % 14 == 3 {
            push("payroll", "ACME Payroll", -1_850.0, &["Transfer", "Payroll"]);
        }
        if days_ago % 7 == 1 {
            push("groceries", "Corner Market", 84.37, &["Shops", "Supermarkets and Groceries"]);
        }
        if days_ago % 7 < 5 {
            push("coffee", "Blue Bottle", 4.75, &["Food and Drink", "Coffee Shop"]);
        }
        if date.day() == 1 {
            push("rent", "Landlord LLC", 1_400.0, &["Payment", "Rent"]);
        }
    }
    rows
}
