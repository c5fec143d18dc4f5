//! Live context collected from the portfolio sites.
//!
//! [`ContextAggregator::get_context`] scrapes every configured site
//! concurrently and caches the labeled aggregate for a fixed window, so chat
//! turns inside that window reuse it without any network I/O.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::scraper::{
    build_client, fetch_html, format_block, strip_html, unreachable_block, SiteDescriptor,
    DEFAULT_CHAR_BUDGET, DEFAULT_SITES,
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of "now" for cache freshness checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let Ok(by) = chrono::Duration::from_std(by) else {
            return;
        };
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub text: String,
    pub fetched_at: DateTime<Utc>,
}

pub struct ContextAggregator {
    client: Client,
    sites: Vec<SiteDescriptor>,
    ttl: Duration,
    fetch_timeout: Duration,
    char_budget: usize,
    clock: Arc<dyn Clock>,
    cache: Mutex<Option<CacheEntry>>,
}

impl ContextAggregator {
    /// Aggregator over the default portfolio sites with the production limits.
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(build_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            sites: DEFAULT_SITES.clone(),
            ttl: DEFAULT_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            char_budget: DEFAULT_CHAR_BUDGET,
            clock: Arc::new(SystemClock),
            cache: Mutex::new(None),
        }
    }

    pub fn with_sites(mut self, sites: Vec<SiteDescriptor>) -> Self {
        self.sites = sites;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_char_budget(mut self, budget: usize) -> Self {
        self.char_budget = budget;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Snapshot of the current cache entry.
    pub fn cached(&self) -> Option<CacheEntry> {
        self.lock_cache().clone()
    }

    /// Returns the labeled aggregate, scraping only when the cache is stale.
    ///
    /// Never fails: unreachable sites are represented by a placeholder block.
    /// Two callers racing past a stale entry may both scrape; the later
    /// write wins.
    pub async fn get_context(&self) -> String {
        let now = self.clock.now();
        if let Some(text) = self.fresh(now) {
            debug!("Context cache hit");
            return text;
        }

        let started = Instant::now();
        let blocks = join_all(self.sites.iter().map(|site| self.scrape_site(site))).await;
        let text = blocks.join("\n\n");
        info!(
            sites = self.sites.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Context refreshed"
        );

        *self.lock_cache() = Some(CacheEntry { text: text.clone(), fetched_at: now });
        text
    }

    fn fresh(&self, now: DateTime<Utc>) -> Option<String> {
        let cache = self.lock_cache();
        let entry = cache.as_ref()?;
        if entry.text.is_empty() {
            return None;
        }
        // A clock that moved backwards counts as fresh.
        let age = (now - entry.fetched_at).to_std().unwrap_or(Duration::ZERO);
        (age < self.ttl).then(|| entry.text.clone())
    }

    async fn scrape_site(&self, site: &SiteDescriptor) -> String {
        match tokio::time::timeout(self.fetch_timeout, fetch_html(&self.client, &site.url)).await {
            Ok(Ok(html)) => format_block(site, &strip_html(&html, self.char_budget)),
            Ok(Err(e)) => {
                warn!(site = %site.name, url = %site.url, error = %e, "Site fetch failed");
                unreachable_block(site)
            }
            Err(_) => {
                warn!(
                    site = %site.name,
                    url = %site.url,
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "Site fetch timed out"
                );
                unreachable_block(site)
            }
        }
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, Option<CacheEntry>> {
        // The guarded value is replaced whole, so a poisoned lock still holds a valid entry.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
