//! Storage abstraction traits
//!
//! `ProjectBackend` is the source of project snapshots and the target of
//! the link/unlink writes. `ReportStore` keeps the history of generated
//! reports. The engine itself never touches either.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{ProjectCounters, ProjectSnapshot, Requirement, TestSuite};
use crate::report::{Report, StoredReport};
use crate::store::ProjectStore;

/// Types of report history backends available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// One YAML file per project next to the project file
    #[default]
    Yaml,
    /// A single SQLite database
    Sqlite,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Yaml => write!(f, "YAML"),
            BackendType::Sqlite => write!(f, "SQLite"),
        }
    }
}

/// Project names double as file names
pub fn validate_project_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        anyhow::bail!(
            "Invalid project name '{}': use letters, digits, '-' and '_' only",
            name
        );
    }
    Ok(())
}

/// Core trait for project storage
///
/// - `load()` and `save()` work with the whole `ProjectStore`
/// - `modify()` is the read-modify-write primitive; backends that can lock
///   should override it
/// - the remaining operations are defined on top of these three
pub trait ProjectBackend: Send + Sync {
    /// Lists the names of all stored projects
    fn list_projects(&self) -> Result<Vec<String>>;

    /// Loads a project, or `None` if it does not exist
    fn load(&self, project: &str) -> Result<Option<ProjectStore>>;

    /// Saves a project, creating it if needed
    fn save(&self, store: &ProjectStore) -> Result<()>;

    /// Applies `update_fn` to an existing project and saves it back
    fn modify(
        &self,
        project: &str,
        update_fn: &mut dyn FnMut(&mut ProjectStore) -> Result<()>,
    ) -> Result<()> {
        let mut store = self
            .load(project)?
            .ok_or_else(|| EngineError::not_found("Project", project))?;
        update_fn(&mut store)?;
        self.save(&store)
    }

    /// Creates an empty project; fails if it already exists
    fn create_project(&self, project: &str) -> Result<ProjectStore> {
        validate_project_name(project)?;
        if self.load(project)?.is_some() {
            anyhow::bail!("Project already exists: {}", project);
        }
        let store = ProjectStore::new(project);
        self.save(&store)?;
        Ok(store)
    }

    /// Captures the records the engine reads
    fn snapshot(&self, project: &str) -> Result<Option<ProjectSnapshot>> {
        Ok(self.load(project)?.map(|store| store.snapshot()))
    }

    fn list_requirements(&self, project: &str) -> Result<Vec<Requirement>> {
        self.load(project)?
            .map(|store| store.requirements)
            .ok_or_else(|| EngineError::not_found("Project", project).into())
    }

    fn list_suites_with_cases(&self, project: &str) -> Result<Vec<TestSuite>> {
        self.load(project)?
            .map(|store| store.suites)
            .ok_or_else(|| EngineError::not_found("Project", project).into())
    }

    /// Counters recomputed from the stored execution records
    fn project_counters(&self, project: &str) -> Result<ProjectCounters> {
        self.snapshot(project)?
            .map(|snapshot| snapshot.counters())
            .ok_or_else(|| EngineError::not_found("Project", project).into())
    }

    /// Links a test case; returns false if the link already existed
    fn link_test_case(
        &self,
        project: &str,
        requirement: &str,
        test_case: &str,
        actor: &str,
    ) -> Result<bool> {
        let mut changed = false;
        self.modify(project, &mut |store: &mut ProjectStore| {
            changed = store.link_test_case(requirement, test_case, actor)?;
            Ok(())
        })?;
        Ok(changed)
    }

    /// Unlinks a test case; returns false if there was no such link
    fn unlink_test_case(
        &self,
        project: &str,
        requirement: &str,
        test_case: &str,
        actor: &str,
    ) -> Result<bool> {
        let mut changed = false;
        self.modify(project, &mut |store: &mut ProjectStore| {
            changed = store.unlink_test_case(requirement, test_case, actor)?;
            Ok(())
        })?;
        Ok(changed)
    }
}

/// Persistence for generated reports
pub trait ReportStore: Send + Sync {
    /// Stores a report and assigns it an id
    fn save_report(&self, report: &Report) -> Result<StoredReport>;

    /// Lists a project's reports, newest first
    fn list_reports(&self, project: &str) -> Result<Vec<StoredReport>>;

    /// Gets a stored report by id
    fn get_report(&self, id: &Uuid) -> Result<Option<StoredReport>>;
}
