use crate::error::{Result, SiftError};
use crate::snapshot::Codec;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DATA_DIR: &str = ".sift";
pub const DEFAULT_SNAPSHOT_FILE: &str = "search.db";
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(60);

pub const ENV_DATA_DIR: &str = "SIFT_DATA_DIR";
pub const ENV_COMPRESS: &str = "SIFT_COMPRESS";
pub const ENV_SNAPSHOT_INTERVAL: &str = "SIFT_SNAPSHOT_INTERVAL_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Root directory for the snapshot file and logs
    pub data_dir: PathBuf,
    /// Snapshot file name inside `data_dir`
    pub snapshot_file: String,
    /// Wrap snapshots in zstd
    pub compress: bool,
    /// Period of the background snapshot task
    pub snapshot_interval: Duration,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            snapshot_file: DEFAULT_SNAPSHOT_FILE.to_string(),
            compress: false,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
        }
    }
}

impl IndexConfig {
    /// Builds a config from `SIFT_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup(ENV_COMPRESS) {
            config.compress = parse_bool(&raw).ok_or_else(|| {
                SiftError::Config(format!("{} must be a boolean, got {:?}", ENV_COMPRESS, raw))
            })?;
        }

        if let Some(raw) = lookup(ENV_SNAPSHOT_INTERVAL) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                SiftError::Config(format!(
                    "{} must be a whole number of seconds, got {:?}",
                    ENV_SNAPSHOT_INTERVAL, raw
                ))
            })?;
            if secs == 0 {
                return Err(SiftError::Config(format!(
                    "{} must be greater than zero",
                    ENV_SNAPSHOT_INTERVAL
                )));
            }
            config.snapshot_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// `$HOME/.sift`, or `./.sift` when no home directory is known.
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DATA_DIR)
    }

    pub fn with_data_dir(mut self, data_dir: impl AsRef<Path>) -> Self {
        self.data_dir = data_dir.as_ref().to_path_buf();
        self
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn codec(&self) -> Codec {
        if self.compress {
            Codec::Zstd
        } else {
            Codec::MessagePack
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
