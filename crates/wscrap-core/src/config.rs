use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Backoff between store read attempts (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbRetryConfig {
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: f64,
}

impl Default for DbRetryConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: 0.25,
            max_delay_secs: 5.0,
        }
    }
}

/// Global configuration loaded from `~/.config/wscrap/config.toml`, then
/// overridden by environment variables (see [`WscrapConfig::apply_env`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WscrapConfig {
    /// SQLite database file. None = `~/.local/state/wscrap/articles.db`.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Attempts (including the first) when reading pending articles.
    pub db_max_retries: u32,
    /// Orchestrator fan-out multiplier and inner concurrency of each worker.
    pub threads_per_core: usize,
    /// Upper bound in seconds on how long `run` waits for the pipeline.
    pub program_timeout_secs: f64,
    /// Log a milestone every N completed articles.
    pub log_frequency: u64,
    /// Per-request fetch timeout in seconds.
    pub request_timeout_secs: u64,
    /// Reserved: parsed but not consulted; fetch failures are never retried.
    pub web_scrap_retries: u32,
    /// Number of workers. None = available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
    /// How long `dispose` waits for each worker to exit.
    #[serde(default = "default_dispose_grace_secs")]
    pub dispose_grace_secs: u64,
    #[serde(default)]
    pub db_retry: DbRetryConfig,
}

const DEFAULT_PROGRAM_TIMEOUT_SECS: f64 = 10800.0;

fn default_dispose_grace_secs() -> u64 {
    10
}

impl Default for WscrapConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            db_max_retries: 3,
            threads_per_core: 3,
            program_timeout_secs: DEFAULT_PROGRAM_TIMEOUT_SECS,
            log_frequency: 25,
            request_timeout_secs: 60,
            web_scrap_retries: 3,
            workers: None,
            dispose_grace_secs: default_dispose_grace_secs(),
            db_retry: DbRetryConfig::default(),
        }
    }
}

impl WscrapConfig {
    /// Apply environment-style overrides. `lookup` is `std::env::var` in the
    /// binary and a map in tests. Values that fail to parse are logged and ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("DB_PATH").filter(|p| !p.trim().is_empty()) {
            self.db_path = Some(PathBuf::from(path));
        }
        override_parsed(&lookup, "DB_MAX_RETRIES", &mut self.db_max_retries);
        override_parsed(&lookup, "THREADS_PER_CORE", &mut self.threads_per_core);
        override_parsed(&lookup, "PROGRAM_TIMEOUT", &mut self.program_timeout_secs);
        override_parsed(&lookup, "LOG_FREQUENCY", &mut self.log_frequency);
        override_parsed(&lookup, "REQUEST_TIMEOUT", &mut self.request_timeout_secs);
        override_parsed(&lookup, "WEB_SCRAP_RETRIES", &mut self.web_scrap_retries);
        let mut workers = self.workers.unwrap_or(0);
        if override_parsed(&lookup, "WORKERS", &mut workers) {
            self.workers = Some(workers);
        }
    }

    /// Number of pool workers (at least 1).
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(available_cores)
            .max(1)
    }

    /// Inner concurrency limit of each worker (at least 1).
    pub fn inner_concurrency(&self) -> usize {
        self.threads_per_core.max(1)
    }

    /// Orchestrator fan-out width: `threads_per_core × cores`.
    pub fn fanout_width(&self) -> usize {
        self.inner_concurrency() * available_cores()
    }

    /// Negative, NaN or overflowing values fall back to the default.
    pub fn program_timeout(&self) -> Duration {
        match Duration::try_from_secs_f64(self.program_timeout_secs) {
            Ok(timeout) => timeout,
            Err(_) => {
                tracing::warn!(
                    "ignoring program timeout {}: not a valid duration; using {}s",
                    self.program_timeout_secs,
                    DEFAULT_PROGRAM_TIMEOUT_SECS
                );
                Duration::from_secs_f64(DEFAULT_PROGRAM_TIMEOUT_SECS)
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn dispose_grace(&self) -> Duration {
        Duration::from_secs(self.dispose_grace_secs)
    }

    /// Retry policy for reading pending articles.
    pub fn db_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.db_max_retries.max(1),
            base_delay: Duration::try_from_secs_f64(self.db_retry.base_delay_secs)
                .unwrap_or_default(),
            max_delay: Duration::try_from_secs_f64(self.db_retry.max_delay_secs)
                .unwrap_or_default(),
        }
    }
}

/// Returns true if `key` was present and parsed into `slot`.
fn override_parsed<T, F>(lookup: &F, key: &str, slot: &mut T) -> bool
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return false;
    };
    match raw.trim().parse::<T>() {
        Ok(v) => {
            *slot = v;
            true
        }
        Err(_) => {
            tracing::warn!("ignoring {}={:?}: not a valid value", key, raw);
            false
        }
    }
}

pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("wscrap")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<WscrapConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = WscrapConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: WscrapConfig = toml::from_str(&data)?;
    Ok(cfg)
}

/// Config file (if any) with environment overrides applied.
pub fn load() -> Result<WscrapConfig> {
    let mut cfg = load_or_init()?;
    cfg.apply_env(|key| std::env::var(key).ok());
    Ok(cfg)
}
