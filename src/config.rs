use crate::engine::SourceNaming;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub updates: UpdateConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

#[derive(Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub api_token: String,
}

// Hand-written so the token never ends up in logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("account_id", &self.account_id)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpdateConfig {
    #[serde(default)]
    pub force_update_all: bool,
    #[serde(default = "default_check_versions")]
    pub check_versions: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_version_cache_path")]
    pub version_cache_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor_secs: u64,
    #[serde(default = "default_api_delay_ms")]
    pub api_delay_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// One hosted blocklist. `name` drives the remote list and policy names.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub backup_url: Option<String>,
}

impl SourceConfig {
    pub fn new(name: &str, url: &str, backup_url: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            backup_url: backup_url.map(str::to_string),
        }
    }

    /// Primary URL first, then the backup when set.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.url.as_str()).chain(self.backup_url.as_deref())
    }
}

/// Values taken from the command line / process environment at startup.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub api_token: Option<String>,
    pub account_id: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub force_update_all: Option<bool>,
    pub check_versions: Option<bool>,
    pub version_cache_path: Option<String>,
}

// Defaults
fn default_base_url() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}
fn default_check_versions() -> bool {
    true
}
fn default_request_timeout() -> u64 {
    30
}
fn default_version_cache_path() -> String {
    ".blocklist_versions.json".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_backoff_factor() -> u64 {
    5
}
fn default_api_delay_ms() -> u64 {
    100
}
fn default_page_size() -> u32 {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_sources() -> Vec<SourceConfig> {
    const CDN: &str = "https://cdn.jsdelivr.net/gh/hagezi/dns-blocklists@latest/wildcard";
    const MIRROR: &str = "https://gitlab.com/hagezi/mirror/-/raw/main/dns-blocklists/wildcard";
    [
        ("Hagezi Pro++", "pro.plus-onlydomains.txt"),
        ("Hagezi-DynDNS", "dyndns-onlydomains.txt"),
        ("Samsung-native", "native.samsung-onlydomains.txt"),
        ("Vivo-native", "native.vivo-onlydomains.txt"),
        ("OppoRealme-native", "native.oppo-realme-onlydomains.txt"),
        ("Xiaomi-native", "native.xiaomi-onlydomains.txt"),
        ("TikTok-native", "native.tiktok-onlydomains.txt"),
    ]
    .into_iter()
    .map(|(name, file)| SourceConfig {
        name: name.to_string(),
        url: format!("{CDN}/{file}"),
        backup_url: Some(format!("{MIRROR}/{file}")),
    })
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            updates: UpdateConfig::default(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
            sources: default_sources(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            account_id: String::new(),
            api_token: String::new(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            force_update_all: false,
            check_versions: default_check_versions(),
            request_timeout_secs: default_request_timeout(),
            version_cache_path: default_version_cache_path(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_factor_secs: default_backoff_factor(),
            api_delay_ms: default_api_delay_ms(),
            page_size: default_page_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse config TOML")?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(token) = overrides.api_token {
            self.api.api_token = token;
        }
        if let Some(account) = overrides.account_id {
            self.api.account_id = account;
        }
        if let Some(secs) = overrides.request_timeout_secs {
            self.updates.request_timeout_secs = secs;
        }
        if let Some(force) = overrides.force_update_all {
            self.updates.force_update_all = force;
        }
        if let Some(check) = overrides.check_versions {
            self.updates.check_versions = check;
        }
        if let Some(path) = overrides.version_cache_path {
            self.updates.version_cache_path = path;
        }
    }

    /// Rejects configurations the run cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.api.api_token.trim().is_empty() || self.api.account_id.trim().is_empty() {
            bail!("Missing API token or account ID");
        }
        Url::parse(&self.api.base_url).context("Invalid API base URL")?;

        if self.sources.is_empty() {
            bail!("No blocklist sources configured");
        }
        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                bail!("Blocklist source with URL {} has an empty name", source.url);
            }
            if !seen.insert(source.name.as_str()) {
                bail!("Duplicate blocklist source name '{}'", source.name);
            }
            for url in source.urls() {
                Url::parse(url)
                    .with_context(|| format!("Invalid URL for source '{}': {}", source.name, url))?;
            }
        }

        // Each source owns every list whose name starts with its prefix.
        let namings: Vec<SourceNaming> =
            self.sources.iter().map(|s| SourceNaming::new(&s.name)).collect();
        for (i, a) in namings.iter().enumerate() {
            for (j, b) in namings.iter().enumerate().skip(i + 1) {
                if a.list_prefix().starts_with(b.list_prefix())
                    || b.list_prefix().starts_with(a.list_prefix())
                {
                    bail!(
                        "Sources '{}' and '{}' have overlapping list prefixes '{}' and '{}'",
                        self.sources[i].name,
                        self.sources[j].name,
                        a.list_prefix(),
                        b.list_prefix()
                    );
                }
            }
        }

        if self.retry.max_retries == 0 {
            bail!("retry.max_retries must be at least 1");
        }
        if self.retry.page_size == 0 {
            bail!("retry.page_size must be at least 1");
        }
        Ok(())
    }

    /// Account-scoped gateway endpoint, e.g. `.../accounts/{id}/gateway`.
    pub fn gateway_base_url(&self) -> String {
        format!(
            "{}/accounts/{}/gateway",
            self.api.base_url.trim_end_matches('/'),
            self.api.account_id
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.updates.request_timeout_secs)
    }
}
