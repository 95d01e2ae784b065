//! Configuration loading.
//!
//! Reads `AppConfig` from a TOML file and applies environment overrides. The
//! result is meant to be loaded once at startup and handed to `open_stores`
//! and the services by reference.

use crate::paths::AnnoscopePaths;
use annoscope_core::config::{AppConfig, StoreAdapter};
use annoscope_core::error::{AnnoError, Result};
use std::path::{Path, PathBuf};

/// Overrides `store.adapter`.
pub const ENV_STORE_ADAPTER: &str = "ANNOSCOPE_STORE_ADAPTER";
/// Overrides `store.data_dir`.
pub const ENV_DATA_DIR: &str = "ANNOSCOPE_DATA_DIR";

pub struct ConfigService;

impl ConfigService {
    /// Loads the configuration from `path`, or from the default location when
    /// `path` is `None`.
    ///
    /// A missing file yields the defaults. An explicitly given path must
    /// exist.
    pub async fn load(path: Option<&Path>) -> Result<AppConfig> {
        let config = match path {
            Some(path) => Self::read_file(path).await?.ok_or_else(|| {
                AnnoError::config(format!("Config file not found: {}", path.display()))
            })?,
            None => {
                let default_path = AnnoscopePaths::config_file()?;
                Self::read_file(&default_path).await?.unwrap_or_default()
            }
        };
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    /// Parses a configuration document.
    pub fn parse(content: &str) -> Result<AppConfig> {
        toml::from_str(content).map_err(|e| AnnoError::config(format!("Invalid config: {}", e)))
    }

    async fn read_file(path: &Path) -> Result<Option<AppConfig>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                tracing::debug!(target: "config", path = %path.display(), "Loaded config file");
                Self::parse(&content).map(Some)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Applies overrides looked up through `lookup` (the process environment
    /// outside of tests).
    pub fn apply_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(adapter) = lookup(ENV_STORE_ADAPTER) {
            config.store.adapter = adapter
                .parse::<StoreAdapter>()
                .map_err(|e| AnnoError::config(format!("{}: {}", ENV_STORE_ADAPTER, e)))?;
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.is_empty()) {
            config.store.data_dir = Some(PathBuf::from(dir));
        }
        if config.query.default_page_size == 0 {
            return Err(AnnoError::config("query.default_page_size must be at least 1"));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[tokio::test]
    async fn test_load_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        tokio::fs::write(
            &path,
            "[store]\nadapter = \"json_dir\"\ndata_dir = \"/tmp/annoscope\"\n",
        )
        .await
        .unwrap();

        let config = ConfigService::load(Some(&path)).await.unwrap();
        assert_eq!(config.store.adapter, StoreAdapter::JsonDir);
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");
        let err = ConfigService::load(Some(&path)).await.unwrap_err();
        assert!(matches!(err, AnnoError::Config(_)));
    }

    #[test]
    fn test_unknown_adapter_in_file_is_a_config_error() {
        let err = ConfigService::parse("[store]\nadapter = \"mongo\"\n").unwrap_err();
        assert!(matches!(err, AnnoError::Config(_)));
    }

    #[test]
    fn test_env_overrides_win() {
        let config = ConfigService::apply_overrides(
            AppConfig::default(),
            env(&[(ENV_STORE_ADAPTER, "memory"), (ENV_DATA_DIR, "/srv/annoscope")]),
        )
        .unwrap();
        assert_eq!(config.store.adapter, StoreAdapter::Memory);
        assert_eq!(config.store.data_dir, Some(PathBuf::from("/srv/annoscope")));
    }

    #[test]
    fn test_bad_env_adapter_is_rejected() {
        let err = ConfigService::apply_overrides(
            AppConfig::default(),
            env(&[(ENV_STORE_ADAPTER, "redis")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains(ENV_STORE_ADAPTER));
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let config = ConfigService::parse("[query]\ndefault_page_size = 0\n").unwrap();
        assert!(ConfigService::apply_overrides(config, env(&[])).is_err());
    }
}
