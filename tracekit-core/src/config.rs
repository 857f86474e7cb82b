use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::BackendType;
use crate::report::ReportOptions;

pub const ENV_CONFIG_PATH: &str = "TRACEKIT_CONFIG";
pub const ENV_DATA_DIR: &str = "TRACEKIT_DATA_DIR";
pub const ENV_PROJECT: &str = "TRACEKIT_PROJECT";

/// User settings, read from `<config_dir>/tracekit/config.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding project files and report history
    pub data_dir: PathBuf,
    /// Project used when none is given on the command line
    pub default_project: Option<String>,
    pub report_backend: BackendType,
    /// Name recorded in requirement history; falls back to $USER
    pub actor: Option<String>,
    pub report: ReportOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_project: None,
            report_backend: BackendType::default(),
            actor: None,
            report: ReportOptions::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("tracekit"))
        .unwrap_or_else(|| PathBuf::from(".tracekit"))
}

/// Gets the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        return Ok(PathBuf::from(path));
    }

    let config_dir = dirs::config_dir().context("Failed to determine config directory")?;
    Ok(config_dir.join("tracekit").join("config.yaml"))
}

impl Settings {
    /// Loads settings from the default location and applies environment overrides
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(get_config_path()?)?;
        settings.apply_env_from(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Loads settings from `path`; a missing file yields the defaults
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))
    }

    /// Applies `TRACEKIT_DATA_DIR` and `TRACEKIT_PROJECT` as returned by `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(project) = lookup(ENV_PROJECT).filter(|v| !v.is_empty()) {
            self.default_project = Some(project);
        }
    }

    /// Picks the explicit project if given, else the configured default
    pub fn resolve_project(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.default_project.clone())
            .context("No project selected: pass --project, set TRACEKIT_PROJECT or default_project")
    }

    pub fn actor(&self) -> String {
        self.actor
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Location of the SQLite report history
    pub fn reports_db_path(&self) -> PathBuf {
        self.data_dir.join("reports.db")
    }
}
