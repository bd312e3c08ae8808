use std::io;

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter for the HTTP server when `RUST_LOG` is unset.
pub const SERVER_FILTER: &str = "info,sqlx=warn";
/// Filter for the one-shot binaries, which print their results on stdout.
pub const CLI_FILTER: &str = "warn,api=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    /// `LOG_FORMAT=compact` (or `text`) switches to single-line text;
    /// anything else keeps JSON.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "compact" | "text" | "pretty" => Self::Compact,
            _ => Self::Json,
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|raw| Self::parse(&raw))
            .unwrap_or(Self::Json)
    }
}

/// Installs the global subscriber. Logs go to stderr so the report binaries
/// keep stdout for their own output.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let format = LogFormat::from_env();

    let json_layer = (format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_writer(io::stderr)
    });
    let compact_layer = (format == LogFormat::Compact).then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(io::stderr)
    });

    Registry::default()
        .with(env_filter)
        .with(json_layer)
        .with(compact_layer)
        .try_init()?;

    Ok(())
}
