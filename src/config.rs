use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// Seconds a resolved name -> identifier mapping stays valid.
pub const CACHE_TTL_SECONDS: u64 = 300;

/// Global ceiling on outbound notifications per second.
pub const RATE_LIMIT_PER_SECOND: u32 = 10;

/// Highest accepted `rate_limit_per_sec`.
pub const MAX_RATE_LIMIT_PER_SECOND: u32 = 1_000;

/// Total transfer attempts before giving up.
pub const MAX_TRANSFER_ATTEMPTS: u32 = 3;

/// Delay before the second attempt; doubled after every further failure.
pub const INITIAL_RETRY_DELAY_SECONDS: u64 = 5;

/// Maximum duration of a single media stream request (3 minutes).
pub const STREAM_TIMEOUT_SECONDS: u64 = 180;

/// Minimum progress advance, in percentage points, between two progress notices.
pub const PROGRESS_STEP_PERCENT: u8 = 25;

/// Upper bound on transfer-and-deliver sequences running at once.
pub const MAX_CONCURRENT_TRANSFERS: usize = 8;

/// Top-level configuration for the relay engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub cache_ttl_secs: u64,
    pub rate_limit_per_sec: u32,
    pub max_attempts: u32,
    pub initial_retry_delay_secs: u64,
    pub stream_timeout_secs: u64,
    pub progress_step_percent: u8,
    pub max_concurrent_transfers: usize,
    /// Directory for transient files. Empty means the system temp dir.
    pub transient_dir: String,
    /// Extension appended to a document name when searching the remote store.
    pub document_extension: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: CACHE_TTL_SECONDS,
            rate_limit_per_sec: RATE_LIMIT_PER_SECOND,
            max_attempts: MAX_TRANSFER_ATTEMPTS,
            initial_retry_delay_secs: INITIAL_RETRY_DELAY_SECONDS,
            stream_timeout_secs: STREAM_TIMEOUT_SECONDS,
            progress_step_percent: PROGRESS_STEP_PERCENT,
            max_concurrent_transfers: MAX_CONCURRENT_TRANSFERS,
            transient_dir: String::new(),
            document_extension: "pdf".to_string(),
        }
    }
}

impl RelayConfig {
    /// Parse a TOML document. Keys that are absent keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("invalid relay config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading relay config {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rate_limit_per_sec == 0 || self.rate_limit_per_sec > MAX_RATE_LIMIT_PER_SECOND {
            return Err(anyhow!(
                "rate_limit_per_sec must be in 1..={}, got {}",
                MAX_RATE_LIMIT_PER_SECOND,
                self.rate_limit_per_sec
            ));
        }
        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be > 0"));
        }
        if self.progress_step_percent == 0 || self.progress_step_percent > 100 {
            return Err(anyhow!(
                "progress_step_percent must be in 1..=100, got {}",
                self.progress_step_percent
            ));
        }
        if self.max_concurrent_transfers == 0 {
            return Err(anyhow!("max_concurrent_transfers must be > 0"));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Minimum spacing between two deliveries by the dispatcher worker.
    pub fn dispatch_interval(&self) -> Duration {
        (Duration::from_secs(1) / self.rate_limit_per_sec.max(1)).max(Duration::from_nanos(1))
    }

    pub fn initial_retry_delay(&self) -> Duration {
        Duration::from_secs(self.initial_retry_delay_secs)
    }

    pub fn stream_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_timeout_secs)
    }

    pub fn transient_dir(&self) -> PathBuf {
        if self.transient_dir.trim().is_empty() {
            std::env::temp_dir()
        } else {
            PathBuf::from(&self.transient_dir)
        }
    }

    /// Name the remote store is searched for, e.g. `101-A` -> `101-A.pdf`.
    pub fn remote_file_name(&self, document_name: &str) -> String {
        let ext = self.document_extension.trim_start_matches('.');
        if ext.is_empty() {
            document_name.to_string()
        } else {
            format!("{}.{}", document_name, ext)
        }
    }
}
