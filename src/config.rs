//! Configuration management for shelfscan.
//!
//! Settings are resolved in layers: built-in defaults, then an optional TOML
//! config file, then environment overrides, then command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repository::util::is_postgres_url;
use crate::repository::DbContext;

/// Default database filename inside the data directory.
pub const DEFAULT_DATABASE_FILENAME: &str = "shelfscan.db";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SHELFSCAN_CONFIG";

/// Site the scraper crawls by default.
pub const DEFAULT_BASE_URL: &str = "https://www.worldofbooks.com";

pub const DEFAULT_TTL_HOURS: u64 = 24;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2_000;
pub const DEFAULT_MAX_CONCURRENCY: usize = 2;
pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: u32 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_JOB_MAX_AGE_SECS: u64 = 15 * 60;
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid setting {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// How pages are fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchTransport {
    /// Plain HTTP requests. Pages are parsed as served.
    #[default]
    Http,
    /// Headless Chromium. Requires the `browser` feature.
    Browser,
}

impl FetchTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Browser => "browser",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "http" => Some(Self::Http),
            "browser" | "chromium" => Some(Self::Browser),
            _ => None,
        }
    }
}

/// Resolved scraper settings.
#[derive(Debug, Clone)]
pub struct ScraperSettings {
    /// Site root; relative links are resolved against it.
    pub base_url: String,
    /// Age after which a scraped record is stale.
    pub ttl: Duration,
    /// Pause between page load and extraction.
    pub settle_delay: Duration,
    pub max_concurrency: usize,
    pub max_requests_per_minute: u32,
    pub request_timeout: Duration,
    /// Deadline for a whole stage. None disables it.
    pub stage_timeout: Option<Duration>,
    /// Open jobs older than this are failed by the watchdog.
    pub job_max_age: Duration,
    pub user_agent: String,
    pub transport: FetchTransport,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ttl: Duration::from_secs(DEFAULT_TTL_HOURS * 3600),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_requests_per_minute: DEFAULT_MAX_REQUESTS_PER_MINUTE,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            stage_timeout: None,
            job_max_age: Duration::from_secs(DEFAULT_JOB_MAX_AGE_SECS),
            user_agent: format!("shelfscan/{}", env!("CARGO_PKG_VERSION")),
            transport: FetchTransport::Http,
        }
    }
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
    /// Address the HTTP server binds to.
    pub bind_address: String,
    pub scraper: ScraperSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shelfscan");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            bind_address: DEFAULT_BIND.to_string(),
            scraper: ScraperSettings::default(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            url.clone()
        } else {
            format!("sqlite:{}", self.database_path().display())
        }
    }

    /// Check if using PostgreSQL (vs SQLite).
    pub fn is_postgres(&self) -> bool {
        self.database_url
            .as_ref()
            .is_some_and(|url| is_postgres_url(url))
    }

    /// Get the full path to the database (for SQLite file-based databases).
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create data directory '{}': {}",
                    self.data_dir.display(),
                    e
                ),
            )
        })
    }

    /// Create a database context using the configured database URL or path.
    pub fn create_db_context(&self) -> Result<DbContext, diesel::result::Error> {
        DbContext::from_url(&self.database_url())
    }
}

/// Scraper section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScraperConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_hours: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requests_per_minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Zero disables the stage deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_max_age_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<FetchTransport>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path, relative to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Database URL (sqlite path or postgres URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Server bind address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Path the config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a specific TOML file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with `~/` are expanded to the home directory
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        if let Some(rest) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }

        let path = Path::new(path_str);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(
        &self,
        settings: &mut Settings,
        base_dir: &Path,
    ) -> Result<(), ConfigError> {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref url) = self.database_url {
            settings.database_url = Some(url.clone());
        }
        if let Some(ref bind) = self.bind {
            settings.bind_address = bind.clone();
        }

        let s = &self.scraper;
        let scraper = &mut settings.scraper;
        if let Some(ref base_url) = s.base_url {
            url::Url::parse(base_url).map_err(|e| ConfigError::Invalid {
                key: "scraper.base_url",
                message: e.to_string(),
            })?;
            scraper.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(hours) = s.ttl_hours {
            scraper.ttl = Duration::from_secs(hours * 3600);
        }
        if let Some(ms) = s.settle_delay_ms {
            scraper.settle_delay = Duration::from_millis(ms);
        }
        if let Some(n) = s.max_concurrency {
            if n == 0 {
                return Err(ConfigError::Invalid {
                    key: "scraper.max_concurrency",
                    message: "must be at least 1".to_string(),
                });
            }
            scraper.max_concurrency = n;
        }
        if let Some(rpm) = s.max_requests_per_minute {
            if rpm == 0 {
                return Err(ConfigError::Invalid {
                    key: "scraper.max_requests_per_minute",
                    message: "must be at least 1".to_string(),
                });
            }
            scraper.max_requests_per_minute = rpm;
        }
        if let Some(secs) = s.request_timeout_secs {
            scraper.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = s.stage_timeout_secs {
            scraper.stage_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(secs) = s.job_max_age_secs {
            scraper.job_max_age = Duration::from_secs(secs);
        }
        if let Some(ref ua) = s.user_agent {
            scraper.user_agent = ua.clone();
        }
        if let Some(transport) = s.transport {
            scraper.transport = transport;
        }
        Ok(())
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory override (--data flag).
    pub data: Option<PathBuf>,
}

/// Find the config file to load.
///
/// Order: explicit path, `$SHELFSCAN_CONFIG`, `./shelfscan.toml`,
/// `<config_dir>/shelfscan/config.toml`.
pub fn discover_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from("shelfscan.toml");
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|d| d.join("shelfscan").join("config.toml"))
        .filter(|p| p.exists())
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub fn load_settings_with_options(options: LoadOptions) -> Result<(Settings, Config), ConfigError> {
    let config = match discover_config_path(options.config_path.as_deref()) {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            Config::load_from_path(&path)?
        }
        None => Config::default(),
    };

    let mut settings = Settings::default();
    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    config.apply_to_settings(&mut settings, &base_dir)?;

    if let Some(url) = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()) {
        settings.database_url = Some(url);
    }

    if let Some(data) = options.data {
        settings.data_dir = data;
    }

    Ok((settings, config))
}
