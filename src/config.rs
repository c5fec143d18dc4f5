use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use crate::error::{AppError, Result};
use crate::prompt::PromptMode;

pub const DEFAULT_COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 600;
pub const DEFAULT_REFERER: &str = "https://nikshep.vercel.app";
pub const DEFAULT_APP_TITLE: &str = "Nikshep's Portfolio";

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub openrouter_api_key: String,
    pub completions_url: String,
    pub model: String,
    pub max_tokens: u32,
    /// Sent as `HTTP-Referer` so OpenRouter can attribute the calling app.
    pub referer: String,
    /// Sent as `X-Title`.
    pub app_title: String,
    pub prompt_mode: PromptMode,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let openrouter_api_key = env::var("OPENROUTER_API_KEY")?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let server_addr = parse_addr(&host, &port)?;

        let max_tokens = match env::var("MAX_TOKENS") {
            Ok(raw) => raw
                .parse::<u32>()
                .map_err(|e| AppError::ConfigError(format!("Invalid MAX_TOKENS: {}", e)))?,
            Err(_) => DEFAULT_MAX_TOKENS,
        };

        let prompt_mode = match env::var("PROMPT_MODE") {
            Ok(raw) => PromptMode::from_str(&raw)?,
            Err(_) => PromptMode::default(),
        };

        Ok(Config {
            server_addr,
            openrouter_api_key,
            completions_url: env::var("OPENROUTER_URL")
                .unwrap_or_else(|_| DEFAULT_COMPLETIONS_URL.to_string()),
            model: env::var("OPENROUTER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            max_tokens,
            referer: env::var("APP_REFERER").unwrap_or_else(|_| DEFAULT_REFERER.to_string()),
            app_title: env::var("APP_TITLE").unwrap_or_else(|_| DEFAULT_APP_TITLE.to_string()),
            prompt_mode,
        })
    }

    /// Config with every default filled in, for callers that only know the key.
    pub fn with_api_key(openrouter_api_key: impl Into<String>) -> Self {
        Config {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            openrouter_api_key: openrouter_api_key.into(),
            completions_url: DEFAULT_COMPLETIONS_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            referer: DEFAULT_REFERER.to_string(),
            app_title: DEFAULT_APP_TITLE.to_string(),
            prompt_mode: PromptMode::default(),
        }
    }
}

fn parse_addr(host: &str, port: &str) -> Result<SocketAddr> {
    let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
    let ip = IpAddr::from_str(host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;
    Ok(SocketAddr::new(ip, port))
}
