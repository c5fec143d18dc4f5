pub mod aggregator;
pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod scraper;

use std::sync::Arc;
use std::time::Duration;
use aggregator::ContextAggregator;
use config::Config;
use error::Result;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub aggregator: Arc<ContextAggregator>,
    /// Client for the completion API.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_aggregator(config, ContextAggregator::new()?)
    }

    pub fn with_aggregator(config: Config, aggregator: ContextAggregator) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(AppState {
            config: Arc::new(config),
            aggregator: Arc::new(aggregator),
            http,
        })
    }
}

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the default `info` level.
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
