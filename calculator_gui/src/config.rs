use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

const CONFIG_VERSION: u32 = 1;
const CONFIG_FILE: &str = "calculator_gui.json";
const DEFAULT_TARGET_ITEM: &str = "半木结构仓库";
const DEFAULT_TARGET_QUANTITY: &str = "1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io failed: {0}")]
    Io(#[from] io::Error),
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Window preferences. Inventory rows are deliberately not part of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub version: u32,
    pub bridge_path: Option<String>,
    pub target_item: String,
    pub target_quantity: String,
    pub ui_font_path: Option<String>,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            bridge_path: None,
            target_item: DEFAULT_TARGET_ITEM.to_string(),
            target_quantity: DEFAULT_TARGET_QUANTITY.to_string(),
            ui_font_path: None,
        }
    }
}

impl CalculatorConfig {
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!(path = %path.display(), "config unreadable, using defaults: {}", err);
                }
                return Self::default();
            }
        };
        match Self::parse(&contents) {
            Ok(config) => {
                info!(path = %path.display(), "config loaded");
                config
            }
            Err(err) => {
                warn!(path = %path.display(), "{}; using defaults", err);
                Self::default()
            }
        }
    }

    /// A file written by a different config version is replaced by defaults.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents)?;
        if config.version != CONFIG_VERSION {
            return Ok(Self::default());
        }
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}

pub fn config_path() -> PathBuf {
    if let Some(appdata) = std::env::var_os("APPDATA") {
        return PathBuf::from(appdata)
            .join("MaterialCalculator")
            .join(CONFIG_FILE);
    }
    if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(config)
            .join("material_calculator")
            .join(CONFIG_FILE);
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("material_calculator")
            .join(CONFIG_FILE);
    }
    PathBuf::from(CONFIG_FILE)
}
