//! Exporter configuration.

use std::path::{Path, PathBuf};

use ::config::{Config, File};
use serde::Deserialize;

use crate::error::{ExportError, ExportResult};

static DEFAULT_DATA_ROOT: &str = "~/calendarserver/data";
static DEFAULT_DIRECTORY_FILE: &str = "~/calendarserver/accounts.toml";

fn default_data_root() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_ROOT)
}

fn default_directory_file() -> PathBuf {
    PathBuf::from(DEFAULT_DIRECTORY_FILE)
}

/// Configuration at ~/.config/calexport/config.toml, or wherever `--config` points.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Root of the calendar store (`calendars/__uids__/...`, `addressbooks/__uids__/...`).
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    /// TOML accounts file used to resolve `--record` and `--user`.
    #[serde(default = "default_directory_file")]
    pub directory_file: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            data_root: default_data_root(),
            directory_file: default_directory_file(),
        }
    }
}

impl ExportConfig {
    pub fn config_path() -> ExportResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ExportError::Config("Could not determine config directory".into()))?
            .join("calexport");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from an explicit path, which must exist, or from the default
    /// location, writing a commented template there on first use.
    pub fn load(path: Option<&Path>) -> ExportResult<Self> {
        let (config_path, required) = match path {
            Some(p) => (expand(p), true),
            None => {
                let default_path = Self::config_path()?;
                if !default_path.exists() {
                    Self::create_default_config(&default_path)?;
                }
                (default_path, false)
            }
        };
        tracing::debug!(path = %config_path.display(), "loading config");

        Config::builder()
            .add_source(File::from(config_path).required(required))
            .build()
            .map_err(|e| ExportError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ExportError::Config(e.to_string()))
    }

    pub fn data_root(&self) -> PathBuf {
        expand(&self.data_root)
    }

    pub fn directory_file(&self) -> PathBuf {
        expand(&self.directory_file)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> ExportResult<()> {
        let contents = format!(
            "\
# calexport configuration

# Root of the calendar server's data store:
# data_root = \"{}\"

# Accounts file used to look up --record and --user short names:
# directory_file = \"{}\"
",
            DEFAULT_DATA_ROOT, DEFAULT_DIRECTORY_FILE
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ExportError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ExportError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
