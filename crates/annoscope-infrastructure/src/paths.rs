//! Default locations for configuration and file-backed stores.
//!
//! ```text
//! ~/.config/annoscope/
//! └── config.toml          # AppConfig
//!
//! ~/.local/share/annoscope/
//! └── store/               # JsonDirStore root (when no data_dir is set)
//! ```

use annoscope_core::error::{AnnoError, Result};
use std::path::PathBuf;

const APP_DIR: &str = "annoscope";
const CONFIG_FILE: &str = "config.toml";
const STORE_DIR: &str = "store";

pub struct AnnoscopePaths;

impl AnnoscopePaths {
    /// Returns the configuration directory (e.g. `~/.config/annoscope/`).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| AnnoError::config("Cannot determine configuration directory"))
    }

    /// Returns the default configuration file path.
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Returns the default root of the JSON directory store.
    pub fn store_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join(STORE_DIR))
            .ok_or_else(|| AnnoError::config("Cannot determine data directory"))
    }
}
