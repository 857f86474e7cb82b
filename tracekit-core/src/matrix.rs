//! Traceability matrix
//!
//! Joins each requirement to the test cases it links, producing one
//! `CoverageRow` per requirement in requirement order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{percent, ExecutionStatus, Priority, ProjectSnapshot, Requirement, TestCase, TestSuite};

/// A test case resolved through a requirement link, with its owning suite
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkedTestCase {
    pub suite_id: Uuid,
    pub suite_name: String,
    pub test_case: TestCase,
}

impl LinkedTestCase {
    pub fn status(&self) -> Option<ExecutionStatus> {
        self.test_case.last_execution_status
    }
}

/// Status counts over a requirement's linked test cases
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ExecutionBreakdown {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub blocked: usize,
    pub not_executed: usize,
}

impl ExecutionBreakdown {
    fn tally<'a>(cases: impl IntoIterator<Item = &'a LinkedTestCase>) -> Self {
        let mut breakdown = ExecutionBreakdown::default();
        for case in cases {
            breakdown.total += 1;
            match case.status() {
                Some(ExecutionStatus::Passed) => breakdown.passed += 1,
                Some(ExecutionStatus::Failed) => breakdown.failed += 1,
                Some(ExecutionStatus::Blocked) => breakdown.blocked += 1,
                None => breakdown.not_executed += 1,
            }
        }
        breakdown
    }

    /// Cases that have reached a terminal status
    pub fn executed(&self) -> usize {
        self.passed + self.failed + self.blocked
    }
}

/// One requirement with its resolved test cases and derived statistics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageRow {
    pub requirement: Requirement,
    pub linked_test_cases: Vec<LinkedTestCase>,
    /// Linked cases over every case in the project. Display only.
    pub coverage: f64,
    /// Passed cases over cases with a terminal status
    pub pass_rate: f64,
    pub execution_summary: ExecutionBreakdown,
}

impl CoverageRow {
    pub fn is_covered(&self) -> bool {
        !self.linked_test_cases.is_empty()
    }

    pub fn priority(&self) -> Option<Priority> {
        self.requirement.priority
    }

    pub fn failing_tests(&self) -> Vec<&LinkedTestCase> {
        self.linked_test_cases
            .iter()
            .filter(|c| c.status() == Some(ExecutionStatus::Failed))
            .collect()
    }
}

/// Builds coverage rows against a fixed set of suites
pub struct MatrixBuilder<'a> {
    lookup: HashMap<&'a str, (&'a TestCase, &'a TestSuite)>,
    total_test_cases: usize,
}

impl<'a> MatrixBuilder<'a> {
    /// Flattens every suite into a single test case lookup.
    ///
    /// Test case IDs are assumed unique across the project; a later
    /// duplicate replaces the earlier entry.
    pub fn new(suites: &'a [TestSuite]) -> Self {
        let mut lookup = HashMap::new();
        let mut total_test_cases = 0;

        for suite in suites {
            for case in &suite.test_cases {
                total_test_cases += 1;
                if let Some((_, previous)) = lookup.insert(case.id.as_str(), (case, suite)) {
                    warn!(
                        test_case = %case.id,
                        first_suite = %previous.name,
                        second_suite = %suite.name,
                        "Duplicate test case id, keeping the later suite"
                    );
                }
            }
        }

        Self {
            lookup,
            total_test_cases,
        }
    }

    pub fn total_test_cases(&self) -> usize {
        self.total_test_cases
    }

    /// Builds the row for one requirement. Dangling links are dropped.
    pub fn row(&self, requirement: &Requirement) -> CoverageRow {
        let linked_test_cases: Vec<LinkedTestCase> = requirement
            .linked_test_cases
            .iter()
            .filter_map(|id| match self.lookup.get(id.as_str()) {
                Some((case, suite)) => Some(LinkedTestCase {
                    suite_id: suite.id,
                    suite_name: suite.name.clone(),
                    test_case: (*case).clone(),
                }),
                None => {
                    debug!(requirement = %requirement.code, test_case = %id, "Dropping dangling link");
                    None
                }
            })
            .collect();

        let execution_summary = ExecutionBreakdown::tally(&linked_test_cases);

        CoverageRow {
            requirement: requirement.clone(),
            coverage: percent(linked_test_cases.len(), self.total_test_cases),
            pass_rate: percent(execution_summary.passed, execution_summary.executed()),
            execution_summary,
            linked_test_cases,
        }
    }

    pub fn build(&self, requirements: &[Requirement]) -> Vec<CoverageRow> {
        requirements.iter().map(|r| self.row(r)).collect()
    }
}

/// Builds the full matrix for a snapshot
pub fn build_matrix(snapshot: &ProjectSnapshot) -> Vec<CoverageRow> {
    let matrix = MatrixBuilder::new(&snapshot.suites).build(&snapshot.requirements);
    debug!(
        project = %snapshot.project,
        rows = matrix.len(),
        "Built traceability matrix"
    );
    matrix
}

/// Builds the row for a single requirement, addressed by code or UUID
pub fn row_for(snapshot: &ProjectSnapshot, reference: &str) -> EngineResult<CoverageRow> {
    let requirement = snapshot
        .requirements
        .iter()
        .find(|r| r.matches_reference(reference))
        .ok_or_else(|| EngineError::not_found("Requirement", reference))?;

    Ok(MatrixBuilder::new(&snapshot.suites).row(requirement))
}
