//! Storage layer for projects and report history
//!
//! Projects are always YAML files under the data directory. Report history
//! goes either next to them or into a single SQLite database, depending on
//! `Settings::report_backend`.

mod sqlite_backend;
mod traits;
mod yaml_backend;

pub use sqlite_backend::SqliteReportStore;
pub use traits::{validate_project_name, BackendType, ProjectBackend, ReportStore};
pub use yaml_backend::YamlBackend;

use anyhow::Result;

use crate::config::Settings;

/// Opens the project backend for the configured data directory
pub fn open_project_backend(settings: &Settings) -> YamlBackend {
    YamlBackend::new(&settings.data_dir)
}

/// Opens the configured report history backend
pub fn open_report_store(settings: &Settings) -> Result<Box<dyn ReportStore>> {
    match settings.report_backend {
        BackendType::Yaml => Ok(Box::new(YamlBackend::new(&settings.data_dir))),
        BackendType::Sqlite => Ok(Box::new(SqliteReportStore::new(
            settings.reports_db_path(),
        )?)),
    }
}
