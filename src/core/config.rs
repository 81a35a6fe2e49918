use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_MFAPI_URL: &str = "https://api.mfapi.in";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MfApiProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub mfapi: Option<MfApiProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            mfapi: Some(MfApiProviderConfig {
                base_url: DEFAULT_MFAPI_URL.to_string(),
            }),
        }
    }
}

fn default_nav_history_rows() -> usize {
    10
}

fn default_search_limit() -> usize {
    25
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub data_path: Option<String>,
    #[serde(default = "default_nav_history_rows")]
    pub nav_history_rows: usize,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            providers: ProvidersConfig::default(),
            data_path: None,
            nav_history_rows: default_nav_history_rows(),
            search_limit: default_search_limit(),
        }
    }
}

impl AppConfig {
    /// Loads the default config file, falling back to defaults when it
    /// does not exist.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "mfbook", "mfbook")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("in", "mfbook", "mfbook")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn mfapi_base_url(&self) -> &str {
        self.providers
            .mfapi
            .as_ref()
            .map_or(DEFAULT_MFAPI_URL, |p| &p.base_url)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
