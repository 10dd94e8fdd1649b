use crate::error::{Result, TreeLockError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_STALE_MINUTES: u32 = 120;
const DEFAULT_TABLE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeLockConfig {
    #[serde(default)]
    pub locking: LockingConfig,

    /// Age in minutes after which a record is considered stale and eligible
    /// for `sweep`.
    #[serde(default = "default_stale_minutes")]
    pub stale_minutes: u32,
}

impl Default for TreeLockConfig {
    fn default() -> Self {
        Self {
            locking: LockingConfig::default(),
            stale_minutes: DEFAULT_STALE_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockingConfig {
    /// How long one store operation may wait for the table lock.
    #[serde(default = "default_table_timeout_secs")]
    pub table_timeout_secs: u64,
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            table_timeout_secs: DEFAULT_TABLE_TIMEOUT_SECS,
        }
    }
}

impl LockingConfig {
    pub fn table_timeout(&self) -> Duration {
        Duration::from_secs(self.table_timeout_secs)
    }
}

fn default_stale_minutes() -> u32 {
    DEFAULT_STALE_MINUTES
}

fn default_table_timeout_secs() -> u64 {
    DEFAULT_TABLE_TIMEOUT_SECS
}

impl TreeLockConfig {
    pub fn load(store_root: &Path) -> Result<Self> {
        let config_path = store_root.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            log::debug!("Config file not found at {config_path:?}, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: TreeLockConfig = toml::from_str(&contents)
            .map_err(|e| TreeLockError::ConfigError(format!("Failed to parse config.toml: {e}")))?;

        log::debug!("Loaded config from {config_path:?}");
        Ok(config)
    }

    pub fn save(&self, store_root: &Path) -> Result<()> {
        let config_path = store_root.join(CONFIG_FILE_NAME);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| TreeLockError::ConfigError(format!("Failed to serialize config: {e}")))?;

        fs::write(&config_path, contents)?;
        log::debug!("Saved config to {config_path:?}");
        Ok(())
    }

    pub fn stale_threshold(&self) -> Duration {
        Duration::from_secs(u64::from(self.stale_minutes) * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = TreeLockConfig::default();
        assert_eq!(config.stale_minutes, DEFAULT_STALE_MINUTES);
        assert_eq!(
            config.locking.table_timeout(),
            Duration::from_secs(DEFAULT_TABLE_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_load_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = TreeLockConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.stale_minutes, DEFAULT_STALE_MINUTES);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();

        let mut config = TreeLockConfig::default();
        config.stale_minutes = 30;
        config.locking.table_timeout_secs = 2;

        config.save(temp_dir.path()).unwrap();

        let loaded = TreeLockConfig::load(temp_dir.path()).unwrap();
        assert_eq!(loaded.stale_minutes, 30);
        assert_eq!(loaded.locking.table_timeout_secs, 2);
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);

        fs::write(&config_path, "stale_minutes = 15").unwrap();

        let loaded = TreeLockConfig::load(temp_dir.path()).unwrap();
        assert_eq!(loaded.stale_minutes, 15);
        assert_eq!(
            loaded.locking.table_timeout_secs,
            DEFAULT_TABLE_TIMEOUT_SECS
        );
    }

    #[test]
    fn test_config_with_locking_section() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);

        fs::write(
            &config_path,
            r#"
stale_minutes = 45

[locking]
table_timeout_secs = 1
"#,
        )
        .unwrap();

        let loaded = TreeLockConfig::load(temp_dir.path()).unwrap();
        assert_eq!(loaded.stale_minutes, 45);
        assert_eq!(loaded.locking.table_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_stale_threshold_in_seconds() {
        let config = TreeLockConfig {
            stale_minutes: 2,
            ..TreeLockConfig::default()
        };
        assert_eq!(config.stale_threshold(), Duration::from_secs(120));
    }
}
