//! Configuration management for autoapply using the prefer crate.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::{RateLimitConfig, RetryPolicy};
use crate::worker::HarvestConfig;

/// Remote platform OAuth client and endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, prefer::FromValue)]
pub struct PlatformConfig {
    #[serde(default)]
    #[prefer(default)]
    pub client_id: String,
    #[serde(default)]
    #[prefer(default)]
    pub client_secret: String,
    #[serde(default)]
    #[prefer(default)]
    pub redirect_uri: String,
    /// Base URL of the REST API.
    #[serde(default = "default_api_base_url")]
    #[prefer(default = "https://api.hh.ru")]
    pub api_base_url: String,
    /// Browser-facing authorization page.
    #[serde(default = "default_auth_url")]
    #[prefer(default = "https://hh.ru/oauth/authorize")]
    pub auth_url: String,
    /// OAuth token endpoint (code exchange and refresh).
    #[serde(default = "default_token_url")]
    #[prefer(default = "https://hh.ru/oauth/token")]
    pub token_url: String,
}

fn default_api_base_url() -> String {
    "https://api.hh.ru".to_string()
}
fn default_auth_url() -> String {
    "https://hh.ru/oauth/authorize".to_string()
}
fn default_token_url() -> String {
    "https://hh.ru/oauth/token".to_string()
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            api_base_url: default_api_base_url(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
        }
    }
}

impl PlatformConfig {
    /// Override credentials from `HH_CLIENT_ID`, `HH_CLIENT_SECRET` and
    /// `HH_REDIRECT_URI` when set.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("HH_CLIENT_ID") {
            self.client_id = v;
        }
        if let Ok(v) = std::env::var("HH_CLIENT_SECRET") {
            self.client_secret = v;
        }
        if let Ok(v) = std::env::var("HH_REDIRECT_URI") {
            self.redirect_uri = v;
        }
    }

    /// Whether OAuth credentials are present.
    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Process-wide per-host request window.
    pub rate_limit: RateLimitConfig,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
    /// Delays and page size for each pass.
    pub harvest: HarvestConfig,
    /// How often `run` enqueues passes for active users, in seconds.
    pub pass_interval_secs: u64,
    /// Upper bound on passes running at the same time.
    pub max_concurrent_passes: usize,
    pub platform: PlatformConfig,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::document_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("autoapply");

        Self {
            data_dir,
            database_filename: "autoapply.db".to_string(),
            user_agent: crate::http::client::USER_AGENT.to_string(),
            request_timeout: 30,
            rate_limit: RateLimitConfig::default(),
            retry: RetryPolicy::default(),
            harvest: HarvestConfig::default(),
            pass_interval_secs: 3600,
            max_concurrent_passes: 4,
            platform: PlatformConfig::default(),
        }
    }
}

impl Settings {
    /// Get the full path to the database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Ensure all directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn pass_interval(&self) -> Duration {
        Duration::from_secs(self.pass_interval_secs.max(1))
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Target directory for data.
    #[serde(default)]
    pub target: Option<String>,
    /// Database filename.
    #[serde(default)]
    pub database: Option<String>,
    /// User agent string.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub request_timeout: Option<u64>,
    /// Requests allowed per host within `rate_limit_window_ms`.
    #[serde(default)]
    pub rate_limit: Option<usize>,
    #[serde(default)]
    pub rate_limit_window_ms: Option<u64>,
    /// Total attempts for rate-limited or failed-to-connect requests.
    #[serde(default)]
    pub retry_attempts: Option<u32>,
    #[serde(default)]
    pub retry_base_delay_ms: Option<u64>,
    #[serde(default)]
    pub retry_max_delay_ms: Option<u64>,
    /// Pause after every apply attempt in milliseconds.
    #[serde(default)]
    pub apply_delay_ms: Option<u64>,
    /// Pause between search pages in milliseconds.
    #[serde(default)]
    pub page_delay_ms: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub pass_interval_secs: Option<u64>,
    #[serde(default)]
    pub max_concurrent_passes: Option<usize>,
    /// Remote platform client credentials and endpoints.
    #[serde(default)]
    pub platform: Option<PlatformConfig>,
}

impl Config {
    /// Load configuration using prefer crate.
    /// Automatically discovers autoapply config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("autoapply").await {
            Ok(pref_config) => Config {
                target: pref_config.get("target").ok(),
                database: pref_config.get("database").ok(),
                user_agent: pref_config.get("user_agent").ok(),
                request_timeout: pref_config.get("request_timeout").ok(),
                rate_limit: pref_config.get("rate_limit").ok(),
                rate_limit_window_ms: pref_config.get("rate_limit_window_ms").ok(),
                retry_attempts: pref_config.get("retry_attempts").ok(),
                retry_base_delay_ms: pref_config.get("retry_base_delay_ms").ok(),
                retry_max_delay_ms: pref_config.get("retry_max_delay_ms").ok(),
                apply_delay_ms: pref_config.get("apply_delay_ms").ok(),
                page_delay_ms: pref_config.get("page_delay_ms").ok(),
                page_size: pref_config.get("page_size").ok(),
                pass_interval_secs: pref_config.get("pass_interval_secs").ok(),
                max_concurrent_passes: pref_config.get("max_concurrent_passes").ok(),
                platform: pref_config.get("platform").ok(),
            },
            Err(_) => {
                // No config file found, use defaults
                Self::default()
            }
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref target) = self.target {
            let path = shellexpand::tilde(target);
            settings.data_dir = PathBuf::from(path.as_ref());
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(limit) = self.rate_limit {
            settings.rate_limit.limit = limit.max(1);
        }
        if let Some(ms) = self.rate_limit_window_ms {
            settings.rate_limit.window = Duration::from_millis(ms);
        }
        if let Some(attempts) = self.retry_attempts {
            settings.retry.max_attempts = attempts.max(1);
        }
        if let Some(ms) = self.retry_base_delay_ms {
            settings.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.retry_max_delay_ms {
            settings.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.apply_delay_ms {
            settings.harvest.apply_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.page_delay_ms {
            settings.harvest.page_delay = Duration::from_millis(ms);
        }
        if let Some(size) = self.page_size {
            settings.harvest.page_size = size.clamp(1, 100);
        }
        if let Some(secs) = self.pass_interval_secs {
            settings.pass_interval_secs = secs;
        }
        if let Some(max) = self.max_concurrent_passes {
            settings.max_concurrent_passes = max.max(1);
        }
        if let Some(ref platform) = self.platform {
            settings.platform = platform.clone();
        }
    }
}

/// Load settings from configuration file and environment.
pub async fn load_settings() -> Settings {
    let config = Config::load().await;
    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings);
    settings.platform.apply_env();
    settings
}
