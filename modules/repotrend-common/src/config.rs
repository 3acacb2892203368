use std::env;
use std::path::PathBuf;

use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // WhatsApp gateway
    pub waha_base_url: String,
    pub waha_session: String,
    pub waha_api_key: Option<String>,

    // GitHub search
    pub github_token: Option<String>,

    // Broadcast cadence
    pub auto_post_enabled: bool,
    /// Informational only; the actual cadence is daily at `post_hour:post_minute`.
    pub post_interval_hours: u32,
    pub post_hour: u32,
    pub post_minute: u32,

    // Discovery
    pub star_threshold: u32,
    pub results_per_keyword: u32,

    /// Statically configured destination groups (comma-separated env var).
    /// Empty means "no static configuration" at resolution time.
    pub target_groups: Vec<String>,

    // Persisted state
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing or malformed.
    pub fn from_env() -> Self {
        let post_hour = numeric_env("POST_HOUR", 9);
        if post_hour > 23 {
            panic!("POST_HOUR must be in 0-23, got {post_hour}");
        }
        let post_minute = numeric_env("POST_MINUTE", 0);
        if post_minute > 59 {
            panic!("POST_MINUTE must be in 0-59, got {post_minute}");
        }

        Self {
            waha_base_url: required_env("WAHA_BASE_URL"),
            waha_session: env::var("WAHA_SESSION").unwrap_or_else(|_| "default".to_string()),
            waha_api_key: env::var("WAHA_API_KEY").ok(),
            github_token: env::var("GITHUB_TOKEN").ok(),
            auto_post_enabled: bool_env("AUTO_POST_ENABLED", true),
            post_interval_hours: numeric_env("POST_INTERVAL_HOURS", 24),
            post_hour,
            post_minute,
            star_threshold: numeric_env("STAR_THRESHOLD", 100),
            results_per_keyword: numeric_env("RESULTS_PER_KEYWORD", 5),
            target_groups: env::var("TARGET_GROUPS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|g| !g.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
        }
    }

    /// Log the effective configuration without leaking secrets.
    pub fn log_redacted(&self) {
        info!(
            waha_base_url = %self.waha_base_url,
            waha_session = %self.waha_session,
            waha_api_key = if self.waha_api_key.is_some() { "set" } else { "unset" },
            github_token = if self.github_token.is_some() { "set" } else { "unset" },
            auto_post_enabled = self.auto_post_enabled,
            post_hour = self.post_hour,
            post_minute = self.post_minute,
            star_threshold = self.star_threshold,
            results_per_keyword = self.results_per_keyword,
            target_groups = self.target_groups.len(),
            data_dir = %self.data_dir.display(),
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn numeric_env(key: &str, default: u32) -> u32 {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number, got {raw:?}")),
        Err(_) => default,
    }
}

fn bool_env(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}
