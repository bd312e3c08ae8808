use std::{env, time::Duration};

use anyhow::{Context, Result};
use domain::DEFAULT_WINDOW_DAYS;

const PLAID_DEFAULT_VERSION: &str = "2020-09-14";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaidEnvironment {
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "sandbox" => Some(Self::Sandbox),
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.plaid.com",
            Self::Development => "https://development.plaid.com",
            Self::Production => "https://production.plaid.com",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PlaidConfig {
    pub environment: PlaidEnvironment,
    pub api_base: String,
    pub client_id: String,
    pub secret: String,
    pub version: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub plaid: PlaidConfig,
    pub frontend_origins: Vec<String>,
    pub default_window_days: u32,
    pub max_window_days: u32,
    pub recent_transactions_limit: usize,
    pub balance_cache_ttl: Duration,
    pub balance_refresh_interval: Duration,
    pub enable_balance_refresher: bool,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let environment = match env::var("PLAID_ENV") {
            Ok(raw) => PlaidEnvironment::parse(&raw).with_context(|| {
                format!("PLAID_ENV must be sandbox, development or production, got {raw}")
            })?,
            Err(_) => PlaidEnvironment::Sandbox,
        };
        let api_base = env::var("PLAID_API_BASE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| environment.base_url().to_string());
        let client_id = env::var("PLAID_CLIENT_ID").unwrap_or_default();
        let secret = env::var("PLAID_SECRET").unwrap_or_default();

        if is_production_environment() && (client_id.is_empty() || secret.is_empty()) {
            anyhow::bail!(
                "PLAID_CLIENT_ID and PLAID_SECRET must be set in production; \
                 balance lookups would fail for every item"
            );
        }

        let max_window_days = parse_u32("BALANCE_MAX_WINDOW_DAYS", 365);
        let default_window_days =
            parse_u32("BALANCE_WINDOW_DAYS", DEFAULT_WINDOW_DAYS).min(max_window_days);

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set for API server")?,
            plaid: PlaidConfig {
                environment,
                api_base,
                client_id,
                secret,
                version: env::var("PLAID_VERSION")
                    .unwrap_or_else(|_| PLAID_DEFAULT_VERSION.to_string()),
            },
            frontend_origins: parse_origins(),
            default_window_days,
            max_window_days,
            recent_transactions_limit: parse_usize("RECENT_TRANSACTIONS_LIMIT", 10),
            balance_cache_ttl: parse_duration_seconds("BALANCE_CACHE_TTL_SECS", 300),
            balance_refresh_interval: parse_duration_seconds("BALANCE_REFRESH_INTERVAL_SECS", 900),
            enable_balance_refresher: parse_bool("ENABLE_BALANCE_REFRESHER", true),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid u16")?,
        })
    }

    /// Clamps a requested window to the configured maximum, falling back to
    /// the default when none was requested.
    pub fn window_days(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_window_days)
            .min(self.max_window_days)
    }
}

fn is_production_environment() -> bool {
    env::var("ENVIRONMENT")
        .or_else(|_| env::var("ENV"))
        .map(|e| {
            let lower = e.to_lowercase();
            lower == "production" || lower == "prod"
        })
        .unwrap_or(false)
}

fn parse_origins() -> Vec<String> {
    if let Ok(list) = env::var("FRONTEND_ORIGINS") {
        split_origins(&list)
    } else if let Ok(origin) = env::var("FRONTEND_ORIGIN") {
        split_origins(&origin)
    } else {
        vec!["http://localhost:3000".to_string()]
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|item| {
            let trimmed = item.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

fn parse_duration_seconds(key: &str, default: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default))
}

fn parse_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn parse_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "on"))
        .unwrap_or(default)
}
