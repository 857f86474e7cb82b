//! In-memory aggregate of one project
//!
//! `ProjectStore` is what the storage backends load and save. It owns the
//! requirement code counter and implements the write operations that mutate
//! requirements, suites and executions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    Execution, ExecutionResult, HistoryAction, Priority, ProjectSnapshot, Requirement,
    RequirementStatus, TestCase, TestSuite,
};

/// Field changes applied by `ProjectStore::update_requirement`
#[derive(Debug, Clone, Default)]
pub struct RequirementUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<RequirementStatus>,
    pub tags: Option<Vec<String>>,
}

/// Everything persisted for one project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStore {
    pub name: String,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub suites: Vec<TestSuite>,
    #[serde(default)]
    pub executions: Vec<Execution>,
    #[serde(default = "default_next_requirement_number")]
    pub next_requirement_number: u32,
}

/// Default value for next_requirement_number
fn default_next_requirement_number() -> u32 {
    1
}

impl ProjectStore {
    /// Creates an empty project store
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requirements: Vec::new(),
            suites: Vec::new(),
            executions: Vec::new(),
            next_requirement_number: 1,
        }
    }

    /// Peeks at the code the next requirement will receive
    pub fn peek_next_code(&self) -> String {
        Requirement::format_code(self.next_requirement_number)
    }

    /// Creates a requirement with the next sequential code
    pub fn create_requirement(
        &mut self,
        name: &str,
        description: &str,
        priority: Option<Priority>,
        tags: Vec<String>,
        actor: &str,
    ) -> &Requirement {
        let code = Requirement::format_code(self.next_requirement_number);
        self.next_requirement_number += 1;

        let mut req = Requirement::new(code.clone(), name, priority);
        req.description = description.to_string();
        req.tags = tags;
        req.record(HistoryAction::Created, actor, format!("Created {}", code));

        self.requirements.push(req);
        &self.requirements[self.requirements.len() - 1]
    }

    /// Gets a requirement by code or UUID
    pub fn requirement(&self, reference: &str) -> EngineResult<&Requirement> {
        self.requirements
            .iter()
            .find(|r| r.matches_reference(reference))
            .ok_or_else(|| EngineError::not_found("Requirement", reference))
    }

    fn requirement_mut(&mut self, reference: &str) -> EngineResult<&mut Requirement> {
        self.requirements
            .iter_mut()
            .find(|r| r.matches_reference(reference))
            .ok_or_else(|| EngineError::not_found("Requirement", reference))
    }

    /// Applies field changes and records one history entry
    pub fn update_requirement(
        &mut self,
        reference: &str,
        update: RequirementUpdate,
        actor: &str,
    ) -> EngineResult<&Requirement> {
        let req = self.requirement_mut(reference)?;
        let mut changed = Vec::new();

        if let Some(name) = update.name {
            if name != req.name {
                changed.push(format!("name: '{}' -> '{}'", req.name, name));
                req.name = name;
            }
        }
        if let Some(description) = update.description {
            if description != req.description {
                changed.push("description".to_string());
                req.description = description;
            }
        }
        if let Some(priority) = update.priority {
            if Some(priority) != req.priority {
                changed.push(format!("priority: {} -> {}", Priority::label(req.priority), priority));
                req.priority = Some(priority);
            }
        }
        if let Some(status) = update.status {
            if status != req.status {
                changed.push(format!("status: {} -> {}", req.status, status));
                req.status = status;
            }
        }
        if let Some(tags) = update.tags {
            if tags != req.tags {
                changed.push(format!("tags: [{}]", tags.join(", ")));
                req.tags = tags;
            }
        }

        let details = if changed.is_empty() {
            "No field changes".to_string()
        } else {
            changed.join("; ")
        };
        req.record(HistoryAction::Updated, actor, details);
        Ok(req)
    }

    /// Returns true if a test case with this ID exists in any suite
    pub fn has_test_case(&self, test_case_id: &str) -> bool {
        self.suites.iter().any(|s| s.find_case(test_case_id).is_some())
    }

    /// Links a test case to a requirement.
    ///
    /// Returns false, without touching the history, if the link already exists.
    pub fn link_test_case(&mut self, reference: &str, test_case_id: &str, actor: &str) -> EngineResult<bool> {
        if !self.has_test_case(test_case_id) {
            return Err(EngineError::not_found("Test case", test_case_id));
        }

        let req = self.requirement_mut(reference)?;
        if !req.linked_test_cases.insert(test_case_id.to_string()) {
            return Ok(false);
        }
        req.record(
            HistoryAction::Linked,
            actor,
            format!("Linked test case {}", test_case_id),
        );
        Ok(true)
    }

    /// Removes a link. Dangling links can be removed too.
    pub fn unlink_test_case(&mut self, reference: &str, test_case_id: &str, actor: &str) -> EngineResult<bool> {
        let req = self.requirement_mut(reference)?;
        if !req.linked_test_cases.remove(test_case_id) {
            return Ok(false);
        }
        req.record(
            HistoryAction::Unlinked,
            actor,
            format!("Unlinked test case {}", test_case_id),
        );
        Ok(true)
    }

    /// Adds an empty suite
    pub fn add_suite(&mut self, name: &str) -> EngineResult<&TestSuite> {
        if self.suites.iter().any(|s| s.name == name) {
            return Err(EngineError::invalid("suite name", name));
        }
        self.suites.push(TestSuite::new(name, self.name.clone()));
        Ok(&self.suites[self.suites.len() - 1])
    }

    /// Gets a suite by name or UUID
    pub fn suite(&self, reference: &str) -> EngineResult<&TestSuite> {
        self.suites
            .iter()
            .find(|s| s.matches_reference(reference))
            .ok_or_else(|| EngineError::not_found("Test suite", reference))
    }

    fn suite_mut(&mut self, reference: &str) -> EngineResult<&mut TestSuite> {
        self.suites
            .iter_mut()
            .find(|s| s.matches_reference(reference))
            .ok_or_else(|| EngineError::not_found("Test suite", reference))
    }

    /// Appends a test case to a suite. IDs must be unique within the suite.
    pub fn add_test_case(&mut self, suite_reference: &str, case: TestCase) -> EngineResult<()> {
        let suite = self.suite_mut(suite_reference)?;
        if suite.find_case(&case.id).is_some() {
            return Err(EngineError::invalid("test case id", case.id));
        }
        suite.test_cases.push(case);
        suite.refresh_stats(None);
        Ok(())
    }

    /// Records a finished run of a suite.
    ///
    /// Every result must name a case of the suite. A case's last execution
    /// status is updated unless the result is skipped or an execution newer
    /// than `executed_at` already decided it. The suite statistics are
    /// recomputed.
    pub fn finalize_execution(
        &mut self,
        suite_reference: &str,
        environment: &str,
        executor: &str,
        results: Vec<ExecutionResult>,
        executed_at: DateTime<Utc>,
    ) -> EngineResult<&Execution> {
        let suite_id = self.suite(suite_reference)?.id;
        let mut decided_at: HashMap<String, DateTime<Utc>> = HashMap::new();
        for execution in self.executions.iter().filter(|e| e.suite_id == suite_id) {
            for result in &execution.results {
                if result.status.terminal().is_none() {
                    continue;
                }
                let at = decided_at
                    .entry(result.test_case_id.clone())
                    .or_insert(execution.executed_at);
                *at = (*at).max(execution.executed_at);
            }
        }

        let suite = self.suite_mut(suite_reference)?;

        let mut seen = HashSet::new();
        for result in &results {
            if suite.find_case(&result.test_case_id).is_none() {
                return Err(EngineError::not_found("Test case", result.test_case_id.clone()));
            }
            if !seen.insert(result.test_case_id.as_str()) {
                return Err(EngineError::invalid("execution result", result.test_case_id.clone()));
            }
        }

        for result in &results {
            let Some(status) = result.status.terminal() else {
                continue;
            };
            if decided_at
                .get(&result.test_case_id)
                .is_some_and(|at| *at > executed_at)
            {
                continue;
            }
            if let Some(case) = suite
                .test_cases
                .iter_mut()
                .find(|c| c.id == result.test_case_id)
            {
                case.last_execution_status = Some(status);
            }
        }
        suite.refresh_stats(Some(executed_at));

        let execution = Execution::new(
            suite.id,
            environment.to_string(),
            executor.to_string(),
            results,
            executed_at,
        );
        self.executions.push(execution);
        Ok(&self.executions[self.executions.len() - 1])
    }

    /// Validates that all requirement codes are unique
    pub fn validate_unique_codes(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for req in &self.requirements {
            if !seen.insert(req.code.as_str()) {
                anyhow::bail!("Duplicate requirement code found: {}", req.code);
            }
        }
        Ok(())
    }

    /// Copies the records the engine reads
    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            project: self.name.clone(),
            requirements: self.requirements.clone(),
            suites: self.suites.clone(),
            executions: self.executions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExecutionStatus, ResultStatus, TestType};

    fn store_with_suite() -> ProjectStore {
        let mut store = ProjectStore::new("alpha");
        store.add_suite("Regression").unwrap();
        store
            .add_test_case("Regression", TestCase::new("TC-1", "Login succeeds"))
            .unwrap();
        store
            .add_test_case(
                "Regression",
                TestCase::new("TC-2", "Login rejects bad password").with_type(TestType::Automated),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_codes_are_sequential() {
        let mut store = ProjectStore::new("alpha");
        let first = store
            .create_requirement("Login", "", Some(Priority::High), Vec::new(), "ana")
            .code
            .clone();
        let second = store
            .create_requirement("Logout", "", None, Vec::new(), "ana")
            .code
            .clone();

        assert_eq!(first, "REQ-001");
        assert_eq!(second, "REQ-002");
        assert_eq!(store.peek_next_code(), "REQ-003");
        assert!(store.validate_unique_codes().is_ok());

        let created = store.requirement("REQ-001").unwrap();
        assert_eq!(created.history.len(), 1);
        assert_eq!(created.history[0].action, HistoryAction::Created);
    }

    #[test]
    fn test_duplicate_codes_detected() {
        let mut store = ProjectStore::new("alpha");
        store.requirements.push(Requirement::new("REQ-001", "a", None));
        store.requirements.push(Requirement::new("REQ-001", "b", None));
        assert!(store.validate_unique_codes().is_err());
    }

    #[test]
    fn test_update_appends_exactly_one_entry() {
        let mut store = ProjectStore::new("alpha");
        store.create_requirement("Login", "", None, Vec::new(), "ana");

        let update = RequirementUpdate {
            priority: Some(Priority::Critical),
            status: Some(RequirementStatus::Approved),
            ..Default::default()
        };
        let req = store.update_requirement("REQ-001", update, "bo").unwrap();

        assert_eq!(req.priority, Some(Priority::Critical));
        assert_eq!(req.status, RequirementStatus::Approved);
        assert_eq!(req.history.len(), 2);
        assert_eq!(req.history[1].action, HistoryAction::Updated);
        assert_eq!(req.history[1].actor, "bo");
        assert!(req.history[1].details.contains("priority: Undefined -> Critical"));
    }

    #[test]
    fn test_link_and_unlink_record_history() {
        let mut store = store_with_suite();
        store.create_requirement("Login", "", Some(Priority::High), Vec::new(), "ana");

        assert!(store.link_test_case("REQ-001", "TC-1", "ana").unwrap());
        assert!(!store.link_test_case("REQ-001", "TC-1", "ana").unwrap());
        assert!(store.unlink_test_case("REQ-001", "TC-1", "ana").unwrap());
        assert!(!store.unlink_test_case("REQ-001", "TC-1", "ana").unwrap());

        let req = store.requirement("REQ-001").unwrap();
        let actions: Vec<_> = req.history.iter().map(|h| h.action).collect();
        assert_eq!(
            actions,
            vec![HistoryAction::Created, HistoryAction::Linked, HistoryAction::Unlinked]
        );
        assert!(req.linked_test_cases.is_empty());
    }

    #[test]
    fn test_link_errors_are_not_found() {
        let mut store = store_with_suite();
        store.create_requirement("Login", "", None, Vec::new(), "ana");

        assert!(store.link_test_case("REQ-001", "TC-404", "ana").unwrap_err().is_not_found());
        assert!(store.link_test_case("REQ-404", "TC-1", "ana").unwrap_err().is_not_found());
    }

    #[test]
    fn test_duplicate_case_in_suite_rejected() {
        let mut store = store_with_suite();
        let err = store
            .add_test_case("Regression", TestCase::new("TC-1", "again"))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { .. }));
        assert!(store.add_suite("Regression").is_err());
    }

    #[test]
    fn test_finalize_execution_updates_cases_and_stats() {
        let mut store = store_with_suite();
        store
            .finalize_execution(
                "Regression",
                "staging",
                "ana",
                vec![ExecutionResult::new("TC-1", ResultStatus::Passed)],
                Utc::now(),
            )
            .unwrap();
        let at = Utc::now();
        let execution = store
            .finalize_execution(
                "Regression",
                "staging",
                "ana",
                vec![
                    ExecutionResult::new("TC-1", ResultStatus::Skipped),
                    ExecutionResult::new("TC-2", ResultStatus::Failed),
                ],
                at,
            )
            .unwrap();
        assert_eq!(execution.summary.failed, 1);
        assert_eq!(execution.summary.skipped, 1);

        let suite = store.suite("Regression").unwrap();
        assert_eq!(
            suite.find_case("TC-1").unwrap().last_execution_status,
            Some(ExecutionStatus::Passed)
        );
        assert_eq!(
            suite.find_case("TC-2").unwrap().last_execution_status,
            Some(ExecutionStatus::Failed)
        );
        assert_eq!(suite.stats.pass_rate, 50.0);
        assert_eq!(suite.stats.automation_rate, 50.0);
        assert_eq!(suite.stats.last_execution, Some(at));
        assert_eq!(store.executions.len(), 2);

        let counters = store.snapshot().counters();
        assert_eq!(counters.executed_tests_count, 2);
        assert_eq!(counters.pass_count, 1);
        assert_eq!(counters.fail_count, 1);
    }

    #[test]
    fn test_backdated_execution_keeps_newer_status() {
        let mut store = store_with_suite();
        store.create_requirement("Login", "", Some(Priority::High), Vec::new(), "ana");
        store.link_test_case("REQ-001", "TC-1", "ana").unwrap();
        let now = Utc::now();
        store
            .finalize_execution(
                "Regression",
                "staging",
                "ana",
                vec![ExecutionResult::new("TC-1", ResultStatus::Failed)],
                now,
            )
            .unwrap();
        store
            .finalize_execution(
                "Regression",
                "staging",
                "ana",
                vec![
                    ExecutionResult::new("TC-1", ResultStatus::Passed),
                    ExecutionResult::new("TC-2", ResultStatus::Passed),
                ],
                now - chrono::Duration::days(1),
            )
            .unwrap();

        let suite = store.suite("Regression").unwrap();
        assert_eq!(
            suite.find_case("TC-1").unwrap().last_execution_status,
            Some(ExecutionStatus::Failed)
        );
        assert_eq!(
            suite.find_case("TC-2").unwrap().last_execution_status,
            Some(ExecutionStatus::Passed)
        );
        assert_eq!(suite.stats.last_execution, Some(now));

        let snapshot = store.snapshot();
        let counters = snapshot.counters();
        assert_eq!(counters.pass_count, 1);
        assert_eq!(counters.fail_count, 1);

        let matrix = crate::matrix::build_matrix(&snapshot);
        assert_eq!(matrix[0].linked_test_cases.len(), 1);
        assert_eq!(
            matrix[0].linked_test_cases[0].status(),
            Some(ExecutionStatus::Failed)
        );
    }

    #[test]
    fn test_finalize_rejects_unknown_case() {
        let mut store = store_with_suite();
        let err = store
            .finalize_execution(
                "Regression",
                "staging",
                "ana",
                vec![ExecutionResult::new("TC-9", ResultStatus::Passed)],
                Utc::now(),
            )
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.executions.is_empty());

        let err = store
            .finalize_execution("Smoke", "staging", "ana", Vec::new(), Utc::now())
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
