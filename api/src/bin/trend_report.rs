use api::{bootstrap::build_state, config::AppConfig, services::dashboard::build_trend, telemetry};
use chrono::NaiveDate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing(telemetry::CLI_FILTER)?;
    let mut config = AppConfig::from_env()?;
    config.enable_balance_refresher = false;

    let item_id = std::env::var("TREND_ITEM_ID").unwrap_or_else(|_| "item-dev-sandbox".to_string());
    let window_days = std::env::var("TREND_WINDOW_DAYS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok());
    let as_of = std::env::var("TREND_AS_OF")
        .ok()
        .and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok());

    let state = build_state(&config).await?;
    let trend = build_trend(&state, &item_id, window_days, as_of)
        .await
        .map_err(|err| anyhow::anyhow!("trend for {item_id} failed: {err}"))?;

    if trend.snapshots.is_empty() {
        println!("Not enough data to display a trend for {item_id}.");
        return Ok(());
    }
    println!(
        "Balance over the last {} days for {} (as of {})",
        trend.window_days, trend.item_id, trend.as_of
    );
    for snapshot in &trend.snapshots {
        println!("{}  {:>12.2}", snapshot.date, snapshot.balance);
    }
    if let Some(summary) = trend.summary {
        println!(
            "net change {:+.2}, high {:.2}, low {:.2}",
            summary.net_change, summary.highest_balance, summary.lowest_balance
        );
    }
    Ok(())
}
