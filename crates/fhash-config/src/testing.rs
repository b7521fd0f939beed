//! Test environment abstraction for isolated config testing.
//!
//! Provides `TestEnvironment` to manage:
//! - A throwaway global config location
//! - A throwaway project config location
//!
//! # Usage
//!
//! ```ignore
//! use fhash_config::testing::TestEnvironment;
//!
//! let env = TestEnvironment::new().unwrap();
//! env.write_project_config("[table]\nbuckets = 64\n").unwrap();
//! let config = env.load().unwrap();
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

use crate::{Config, ConfigError};

/// Atomic counter for unique test IDs
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated test environment with its own config files
pub struct TestEnvironment {
    /// Temporary directory (dropped on cleanup)
    _temp_dir: TempDir,
    /// Stand-in for the home directory
    pub home: PathBuf,
    /// Project root for the test
    pub project_root: PathBuf,
    /// Unique test ID
    pub test_id: u32,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    pub fn new() -> anyhow::Result<Self> {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        let home = root.join("home");
        let project_root = root.join(format!("project-{}", test_id));

        std::fs::create_dir_all(home.join(".fhash"))?;
        std::fs::create_dir_all(project_root.join(".fhash"))?;

        Ok(Self {
            _temp_dir: temp_dir,
            home,
            project_root,
            test_id,
        })
    }

    /// Global config path inside the fake home
    pub fn global_config_path(&self) -> PathBuf {
        self.home.join(".fhash/config.toml")
    }

    /// Project config path inside the project root
    pub fn project_config_path(&self) -> PathBuf {
        self.project_root.join(".fhash/config.toml")
    }

    pub fn write_global_config(&self, contents: &str) -> anyhow::Result<PathBuf> {
        let path = self.global_config_path();
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_project_config(&self, contents: &str) -> anyhow::Result<PathBuf> {
        let path = self.project_config_path();
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Load the global and project files of this environment. The process
    /// environment is ignored, so `FHASH_*` set by the caller cannot leak in.
    pub fn load(&self) -> Result<Config, ConfigError> {
        self.load_with_env(&[])
    }

    /// Like [`load`](Self::load), with `vars` standing in for the environment.
    pub fn load_with_env(&self, vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        Config::load_layers(
            Some(self.global_config_path().as_path()),
            Some(self.project_config_path().as_path()),
            vars.iter().copied(),
        )
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
