//! # fhash-config
//!
//! Configuration management for the fhash file-name index.
//!
//! Loads configuration from:
//! 1. `~/.fhash/config.toml` (global)
//! 2. `.fhash/config.toml` (project-local, overrides global)
//! 3. Environment variables (highest priority)

pub mod logging;
pub mod testing;

pub use fhash::{TableConfig, DEFAULT_BUCKETS, MAX_BUCKETS};
pub use logging::{init_logging, Component, LogLevel};

use once_cell::sync::Lazy;
use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Global config instance
static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::load().unwrap_or_default()));

/// Get global config (read-only)
pub fn config() -> RwLockReadGuard<'static, Config> {
    CONFIG.read()
}

/// Reload config from disk
pub fn reload() -> Result<(), ConfigError> {
    let new_config = Config::load()?;
    *CONFIG.write() = new_config;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub table: TableConfig,
    pub stress: StressConfig,
    pub log: LogConfig,
}

impl Config {
    /// Load config from standard locations, then apply `FHASH_*` environment
    /// overrides from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let global = Self::global_config_path();
        Self::load_layers(
            global.as_deref(),
            Some(Self::project_config_path().as_path()),
            std::env::vars(),
        )
    }

    /// Load config from explicit global and project paths, ignoring the
    /// process environment.
    pub fn load_from(global: Option<&Path>, project: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_layers(global, project, std::iter::empty::<(String, String)>())
    }

    /// Build a config from every layer: global file, project file, then `vars`
    /// as environment overrides. The result is validated once, at the end.
    ///
    /// Missing files are skipped. Keys set in the project file override the
    /// same keys from the global file; everything else is inherited.
    pub fn load_layers<I, K, V>(global: Option<&Path>, project: Option<&Path>, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut merged = toml::Table::new();

        for path in [global, project].into_iter().flatten() {
            if path.exists() {
                debug!("Loading config layer from {:?}", path);
                let contents = std::fs::read_to_string(path)?;
                merge_tables(&mut merged, contents.parse::<toml::Table>()?);
            }
        }

        let mut config: Config = toml::Value::Table(merged).try_into()?;
        config.apply_env(vars);
        config.validate()?;
        Ok(config)
    }

    /// Global config path: ~/.fhash/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".fhash/config.toml"))
    }

    /// Project config path: .fhash/config.toml
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".fhash/config.toml")
    }

    /// Apply `FHASH_BUCKETS`, `FHASH_DUMP_ON_MISS` and `FHASH_THREADS` from
    /// `vars`. Unparseable numbers are ignored.
    pub fn apply_env<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                "FHASH_BUCKETS" => {
                    if let Ok(n) = value.parse() {
                        self.table.buckets = n;
                    }
                }
                "FHASH_DUMP_ON_MISS" => {
                    self.table.dump_on_miss = matches!(value, "1" | "true" | "yes");
                }
                "FHASH_THREADS" => {
                    if let Ok(n) = value.parse() {
                        self.stress.threads = Some(n);
                    }
                }
                _ => {}
            }
        }
    }

    /// Reject values no table can be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.table.bucket_count_valid() {
            return Err(ConfigError::Invalid(format!(
                "table.buckets must be in 1..={}, got {}",
                MAX_BUCKETS, self.table.buckets
            )));
        }
        if self.stress.threads == Some(0) {
            return Err(ConfigError::Invalid(
                "stress.threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate default config TOML string
    pub fn default_toml() -> String {
        Config::default().to_toml()
    }

    /// Serialize this config as pretty TOML.
    pub fn to_toml(&self) -> String {
        // Every field is a plain scalar, serialization cannot fail.
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// Overlay `layer` onto `base`. Nested tables merge key by key; any other
/// value in `layer` replaces the one in `base`.
fn merge_tables(base: &mut toml::Table, layer: toml::Table) {
    for (key, value) in layer {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Workload driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// Number of worker threads (None = auto)
    pub threads: Option<usize>,
    /// Distinct file names shared by the workers
    pub files: usize,
    /// Open/close rounds per worker
    pub rounds: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: None,
            files: 256,
            rounds: 64,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level when neither FHASH_LOG nor RUST_LOG is set
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl LogConfig {
    pub fn level(&self) -> LogLevel {
        LogLevel::parse(&self.level).unwrap_or(LogLevel::Warn)
    }
}
