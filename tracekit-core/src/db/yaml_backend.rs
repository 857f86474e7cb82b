//! YAML file storage backend
//!
//! Each project lives in `<root>/<project>.yaml` and its report history in
//! `<root>/<project>.reports.yaml`. Both go through `Storage`, so reads and
//! read-modify-write cycles are guarded by the same file locks.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use super::traits::{validate_project_name, ProjectBackend, ReportStore};
use crate::error::EngineError;
use crate::report::{Report, StoredReport};
use crate::storage::Storage;
use crate::store::ProjectStore;

const PROJECT_SUFFIX: &str = ".yaml";
const REPORTS_SUFFIX: &str = ".reports.yaml";

/// Report history document of one project
#[derive(Debug, Default, Serialize, Deserialize)]
struct ReportHistory {
    #[serde(default)]
    reports: Vec<StoredReport>,
}

/// YAML file backend rooted at a data directory
pub struct YamlBackend {
    root: PathBuf,
}

impl YamlBackend {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory holding the project files
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_storage(&self, project: &str) -> Result<Storage> {
        validate_project_name(project)?;
        Ok(Storage::new(
            self.root.join(format!("{}{}", project, PROJECT_SUFFIX)),
        ))
    }

    fn report_storage(&self, project: &str) -> Result<Storage> {
        validate_project_name(project)?;
        Ok(Storage::new(
            self.root.join(format!("{}{}", project, REPORTS_SUFFIX)),
        ))
    }

    fn load_history(&self, project: &str) -> Result<Vec<StoredReport>> {
        let history: Option<ReportHistory> = self.report_storage(project)?.load()?;
        let mut reports = history.map(|h| h.reports).unwrap_or_default();
        // Stored in insertion order; newest first, latest insert wins ties
        reports.reverse();
        reports.sort_by(|a, b| b.stored_at.cmp(&a.stored_at));
        Ok(reports)
    }
}

impl ProjectBackend for YamlBackend {
    fn list_projects(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read data directory: {:?}", self.root))?;

        let mut projects = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.ends_with(REPORTS_SUFFIX) {
                continue;
            }
            if let Some(project) = name.strip_suffix(PROJECT_SUFFIX) {
                if validate_project_name(project).is_ok() {
                    projects.push(project.to_string());
                }
            }
        }
        projects.sort();
        Ok(projects)
    }

    fn load(&self, project: &str) -> Result<Option<ProjectStore>> {
        self.project_storage(project)?.load()
    }

    fn save(&self, store: &ProjectStore) -> Result<()> {
        store.validate_unique_codes()?;
        self.project_storage(&store.name)?.save(store)
    }

    /// Runs the update under the project's exclusive lock
    fn modify(
        &self,
        project: &str,
        update_fn: &mut dyn FnMut(&mut ProjectStore) -> Result<()>,
    ) -> Result<()> {
        let storage = self.project_storage(project)?;
        if !storage.exists() {
            return Err(EngineError::not_found("Project", project).into());
        }
        storage.update_atomically(
            || ProjectStore::new(project),
            |store: &mut ProjectStore| {
                update_fn(store)?;
                store.validate_unique_codes()
            },
        )
    }
}

impl ReportStore for YamlBackend {
    fn save_report(&self, report: &Report) -> Result<StoredReport> {
        let stored = StoredReport::new(report.clone());
        self.report_storage(&report.project)?.update_atomically(
            ReportHistory::default,
            |history: &mut ReportHistory| {
                history.reports.push(stored.clone());
                Ok(())
            },
        )?;
        debug!(project = %report.project, report_id = %stored.id, "Appended report to history");
        Ok(stored)
    }

    fn list_reports(&self, project: &str) -> Result<Vec<StoredReport>> {
        self.load_history(project)
    }

    fn get_report(&self, id: &Uuid) -> Result<Option<StoredReport>> {
        for project in self.list_projects()? {
            if let Some(found) = self.load_history(&project)?.into_iter().find(|r| r.id == *id) {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, TestCase};
    use chrono::Utc;
    use tempfile::TempDir;

    fn engine_error(err: &anyhow::Error) -> Option<&EngineError> {
        err.downcast_ref::<EngineError>()
    }

    fn backend_with_suite(dir: &TempDir) -> YamlBackend {
        let backend = YamlBackend::new(dir.path());
        let mut store = backend.create_project("alpha").unwrap();
        store.create_requirement("Login", "", Some(Priority::High), Vec::new(), "ana");
        store.add_suite("Regression").unwrap();
        store
            .add_test_case("Regression", TestCase::new("TC-1", "Valid login"))
            .unwrap();
        backend.save(&store).unwrap();
        backend
    }

    fn empty_report(project: &str) -> Report {
        Report {
            project: project.to_string(),
            generated_at: Utc::now(),
            coverage_matrix: None,
            coverage: None,
            risk: None,
            quality: None,
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn test_create_project_rejects_duplicates_and_bad_names() {
        let dir = TempDir::new().unwrap();
        let backend = YamlBackend::new(dir.path());

        backend.create_project("alpha").unwrap();
        assert!(backend.create_project("alpha").is_err());
        assert!(backend.create_project("../escape").is_err());
        assert!(backend.create_project("").is_err());
    }

    #[test]
    fn test_list_projects_skips_report_files() {
        let dir = TempDir::new().unwrap();
        let backend = backend_with_suite(&dir);
        backend.create_project("beta").unwrap();
        backend.save_report(&empty_report("alpha")).unwrap();

        assert_eq!(backend.list_projects().unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_link_and_unlink_through_backend() {
        let dir = TempDir::new().unwrap();
        let backend = backend_with_suite(&dir);

        assert!(backend.link_test_case("alpha", "REQ-001", "TC-1", "ana").unwrap());
        assert!(!backend.link_test_case("alpha", "REQ-001", "TC-1", "ana").unwrap());

        let requirements = backend.list_requirements("alpha").unwrap();
        assert!(requirements[0].linked_test_cases.contains("TC-1"));
        // Created + Linked
        assert_eq!(requirements[0].history.len(), 2);

        assert!(backend.unlink_test_case("alpha", "REQ-001", "TC-1", "ana").unwrap());
        let requirements = backend.list_requirements("alpha").unwrap();
        assert!(requirements[0].linked_test_cases.is_empty());
        assert_eq!(requirements[0].history.len(), 3);
    }

    #[test]
    fn test_failed_link_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let backend = backend_with_suite(&dir);

        let err = backend
            .link_test_case("alpha", "REQ-001", "TC-404", "ana")
            .unwrap_err();
        assert!(engine_error(&err).is_some_and(|e| e.is_not_found()));

        let requirements = backend.list_requirements("alpha").unwrap();
        assert_eq!(requirements[0].history.len(), 1);
    }

    #[test]
    fn test_missing_project_is_not_found() {
        let dir = TempDir::new().unwrap();
        let backend = YamlBackend::new(dir.path());

        let err = backend
            .link_test_case("ghost", "REQ-001", "TC-1", "ana")
            .unwrap_err();
        assert!(engine_error(&err).is_some_and(|e| e.is_not_found()));
        assert!(backend.list_suites_with_cases("ghost").is_err());
        assert!(backend.snapshot("ghost").unwrap().is_none());
    }

    #[test]
    fn test_project_counters_from_suites() {
        let dir = TempDir::new().unwrap();
        let backend = backend_with_suite(&dir);

        let counters = backend.project_counters("alpha").unwrap();
        assert_eq!(counters.total_tests_count, 1);
        assert_eq!(counters.executed_tests_count, 0);
    }

    #[test]
    fn test_report_history_newest_first() {
        let dir = TempDir::new().unwrap();
        let backend = backend_with_suite(&dir);

        let first = backend.save_report(&empty_report("alpha")).unwrap();
        let second = backend.save_report(&empty_report("alpha")).unwrap();

        let history = backend.list_reports("alpha").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].id, first.id);

        assert_eq!(backend.get_report(&first.id).unwrap(), Some(first));
        assert!(backend.get_report(&Uuid::new_v4()).unwrap().is_none());
        assert!(backend.list_reports("beta").unwrap().is_empty());
    }
}
