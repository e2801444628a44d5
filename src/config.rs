use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Settings baked into the binary, validated by `build.rs`.
const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

/// File name picked up next to the input report when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "report.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub document: DocumentConfig,
    pub page: PageConfig,
    pub font: FontConfig,
    pub links: LinksConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Used for the HTML `<title>` and the PDF document metadata.
    pub title: String,
    /// Running header printed at the top of every page but the first.
    pub header: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            title: "MFA Forced Alignment Report".to_string(),
            header: "Montreal Forced Aligner: Implementation and Analysis Report".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// "Page N of M" footer.
    pub numbers: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self { numbers: true }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct FontConfig {
    /// Also search installed system fonts, not only the embedded ones.
    pub system: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    pub color: String,
    pub underline: bool,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            color: "#2c5282".to_string(),
            underline: false,
        }
    }
}

impl Config {
    /// The settings compiled into the binary.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load config from an explicit TOML file. Unlike [`Config::discover`],
    /// a missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| Error::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Look for `report.toml` in `dir`, or return defaults if not found.
    pub fn discover(dir: &Path) -> Self {
        let path: PathBuf = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, dir.display());
            return Self::compiled_default();
        }
        match Self::load(&path) {
            Ok(config) => {
                debug!("Loaded settings from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring {}: {}", path.display(), e);
                Self::compiled_default()
            }
        }
    }
}
