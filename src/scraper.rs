use reqwest::{Client, ClientBuilder};
use scraper::{Html, Node};
use std::time::Duration;
use once_cell::sync::Lazy;
use crate::error::Result;

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; PortfolioBot/1.0)";

/// Per-site character budget for stripped page text.
pub const DEFAULT_CHAR_BUDGET: usize = 1200;

pub const UNREACHABLE_MARKER: &str = "[Could not fetch: site may be down]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteDescriptor {
    pub name: String,
    pub url: String,
}

impl SiteDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self { name: name.into(), url: url.into() }
    }

    fn header(&self) -> String {
        format!("=== {} ({}) ===", self.name, self.url)
    }
}

/// The portfolio projects scraped for live context, in output order.
pub static DEFAULT_SITES: Lazy<Vec<SiteDescriptor>> = Lazy::new(|| {
    [
        ("Kairos", "https://kairosflow.vercel.app"),
        ("CopiumAI", "https://copiumai.xo.je"),
        ("EntropyZero", "https://entropyzero.vercel.app"),
        ("InstaGen", "https://instagen-hyperdesi.vercel.app"),
        ("RupeeRewind", "https://rupeerewind.vercel.app"),
        ("Aellium", "https://aellium.vercel.app"),
        ("ValentineSpam", "https://valentinespam.xo.je"),
    ]
    .into_iter()
    .map(|(name, url)| SiteDescriptor::new(name, url))
    .collect()
});

/// Client used for scraping. Timeouts are applied per fetch by the caller.
pub fn build_client() -> Result<Client> {
    let client = ClientBuilder::new()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(10)
        .build()?;
    Ok(client)
}

pub async fn fetch_html(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    let html = response.text().await?;
    Ok(html)
}

/// Reduce an HTML document to a single line of visible text.
///
/// Script and style contents are dropped, every tag boundary counts as
/// whitespace, entities are decoded, and whitespace runs collapse to one
/// space. The result is cut to `budget` characters.
pub fn strip_html(html: &str, budget: usize) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::with_capacity(html.len());

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .is_some_and(|element| matches!(element.name(), "script" | "style"));
        if hidden {
            continue;
        }
        raw.push(' ');
        raw.push_str(text);
    }

    let mut result = String::with_capacity(raw.len().min(budget * 4));
    for word in raw.split_whitespace() {
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(word);
    }

    match result.char_indices().nth(budget) {
        Some((cut, _)) => {
            result.truncate(cut);
            result
        }
        None => result,
    }
}

pub fn format_block(site: &SiteDescriptor, text: &str) -> String {
    let header = site.header();
    let mut block = String::with_capacity(header.len() + text.len() + 1);
    block.push_str(&header);
    block.push('\n');
    block.push_str(text);
    block
}

pub fn unreachable_block(site: &SiteDescriptor) -> String {
    format_block(site, UNREACHABLE_MARKER)
}
