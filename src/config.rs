use serde::Deserialize;
use std::path::PathBuf;

/// Backend address used when no base URL is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Default location of the persisted session storage.
pub const DEFAULT_SESSION_FILE: &str = ".aiauto_session.json";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub session_file: PathBuf,
    pub port: u16,
    pub webhook_secret: Option<String>,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            api_base_url: validate_base_url(
                std::env::var("API_BASE_URL")
                    .or_else(|_| std::env::var("VITE_API_BASE_URL"))
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            )?,
            session_file: std::env::var("SESSION_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE)),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("REQUEST_TIMEOUT_SECS must be a positive integer"))
                .and_then(|secs: u64| {
                    if secs == 0 {
                        anyhow::bail!("REQUEST_TIMEOUT_SECS cannot be zero");
                    }
                    Ok(secs)
                })?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("API Base URL: {}", config.api_base_url);
        tracing::debug!("Session file: {}", config.session_file.display());
        tracing::debug!("Server Port: {}", config.port);
        if config.webhook_secret.is_none() {
            tracing::warn!("WEBHOOK_SECRET not set: lead push webhook accepts unauthenticated events");
        }

        Ok(config)
    }
}

/// Checks that a base URL is an absolute http(s) URL and strips any trailing slash.
pub fn validate_base_url(raw: String) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/').to_string();
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        anyhow::bail!("API_BASE_URL must start with http:// or https://");
    }
    url::Url::parse(&trimmed)
        .map_err(|e| anyhow::anyhow!("API_BASE_URL is not a valid URL: {}", e))?;
    Ok(trimmed)
}
