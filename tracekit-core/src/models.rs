use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::EngineError;

/// Bucket label used for records whose priority is unset
pub const UNDEFINED_LABEL: &str = "Undefined";

/// Width of the numeric part of a requirement code (`REQ-001`)
const REQUIREMENT_CODE_WIDTH: usize = 3;

/// Looks up `input` in a label table, case-insensitively.
fn lookup<T: Copy>(table: &[(&str, T)], field: &'static str, input: &str) -> Result<T, EngineError> {
    let key = input.trim().to_lowercase();
    table
        .iter()
        .find(|(label, _)| *label == key)
        .map(|(_, value)| *value)
        .ok_or_else(|| EngineError::invalid(field, input))
}

/// Priority of a requirement or test case
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    #[serde(alias = "low", alias = "Baja")]
    Low,
    #[serde(alias = "medium", alias = "Media")]
    Medium,
    #[serde(alias = "high", alias = "Alta")]
    High,
    #[serde(alias = "critical", alias = "Crítica", alias = "Critica")]
    Critical,
}

const PRIORITY_TABLE: &[(&str, Priority)] = &[
    ("low", Priority::Low),
    ("baja", Priority::Low),
    ("medium", Priority::Medium),
    ("media", Priority::Medium),
    ("high", Priority::High),
    ("alta", Priority::High),
    ("critical", Priority::Critical),
    ("crítica", Priority::Critical),
    ("critica", Priority::Critical),
];

impl Priority {
    /// High and Critical requirements feed the risk analysis
    pub fn is_high_risk(&self) -> bool {
        matches!(self, Priority::High | Priority::Critical)
    }

    /// Bucket label for an optional priority
    pub fn label(priority: Option<Priority>) -> String {
        priority
            .map(|p| p.to_string())
            .unwrap_or_else(|| UNDEFINED_LABEL.to_string())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
            Priority::Critical => write!(f, "Critical"),
        }
    }
}

impl FromStr for Priority {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(PRIORITY_TABLE, "priority", s)
    }
}

/// Lifecycle status of a requirement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RequirementStatus {
    #[default]
    Draft,
    Approved,
    Implemented,
    Verified,
    Obsolete,
}

const REQUIREMENT_STATUS_TABLE: &[(&str, RequirementStatus)] = &[
    ("draft", RequirementStatus::Draft),
    ("approved", RequirementStatus::Approved),
    ("implemented", RequirementStatus::Implemented),
    ("verified", RequirementStatus::Verified),
    ("obsolete", RequirementStatus::Obsolete),
];

impl fmt::Display for RequirementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementStatus::Draft => write!(f, "Draft"),
            RequirementStatus::Approved => write!(f, "Approved"),
            RequirementStatus::Implemented => write!(f, "Implemented"),
            RequirementStatus::Verified => write!(f, "Verified"),
            RequirementStatus::Obsolete => write!(f, "Obsolete"),
        }
    }
}

impl FromStr for RequirementStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(REQUIREMENT_STATUS_TABLE, "requirement status", s)
    }
}

/// How a test case is carried out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TestType {
    #[default]
    Manual,
    Automated,
    Exploratory,
}

const TEST_TYPE_TABLE: &[(&str, TestType)] = &[
    ("manual", TestType::Manual),
    ("automated", TestType::Automated),
    ("automatizado", TestType::Automated),
    ("exploratory", TestType::Exploratory),
    ("exploratorio", TestType::Exploratory),
];

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestType::Manual => write!(f, "Manual"),
            TestType::Automated => write!(f, "Automated"),
            TestType::Exploratory => write!(f, "Exploratory"),
        }
    }
}

impl FromStr for TestType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(TEST_TYPE_TABLE, "test type", s)
    }
}

/// Terminal status recorded on a test case after an execution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ExecutionStatus {
    Passed,
    Failed,
    Blocked,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Passed => write!(f, "Passed"),
            ExecutionStatus::Failed => write!(f, "Failed"),
            ExecutionStatus::Blocked => write!(f, "Blocked"),
        }
    }
}

/// Outcome of a single test case within one execution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResultStatus {
    Passed,
    Failed,
    Blocked,
    Skipped,
}

const RESULT_STATUS_TABLE: &[(&str, ResultStatus)] = &[
    ("passed", ResultStatus::Passed),
    ("pass", ResultStatus::Passed),
    ("failed", ResultStatus::Failed),
    ("fail", ResultStatus::Failed),
    ("blocked", ResultStatus::Blocked),
    ("skipped", ResultStatus::Skipped),
    ("skip", ResultStatus::Skipped),
];

impl ResultStatus {
    /// The status left on the test case; skipped runs leave no trace
    pub fn terminal(&self) -> Option<ExecutionStatus> {
        match self {
            ResultStatus::Passed => Some(ExecutionStatus::Passed),
            ResultStatus::Failed => Some(ExecutionStatus::Failed),
            ResultStatus::Blocked => Some(ExecutionStatus::Blocked),
            ResultStatus::Skipped => None,
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultStatus::Passed => write!(f, "Passed"),
            ResultStatus::Failed => write!(f, "Failed"),
            ResultStatus::Blocked => write!(f, "Blocked"),
            ResultStatus::Skipped => write!(f, "Skipped"),
        }
    }
}

impl FromStr for ResultStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(RESULT_STATUS_TABLE, "result status", s)
    }
}

/// Kind of change recorded in a requirement's audit history
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Created,
    Updated,
    Linked,
    Unlinked,
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryAction::Created => write!(f, "created"),
            HistoryAction::Updated => write!(f, "updated"),
            HistoryAction::Linked => write!(f, "linked"),
            HistoryAction::Unlinked => write!(f, "unlinked"),
        }
    }
}

/// One entry of a requirement's append-only audit trail
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub details: String,
}

/// A tracked capability or constraint of the system under test
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirement {
    /// Unique identifier (UUID)
    pub id: Uuid,

    /// Human-readable sequential code (e.g., "REQ-001")
    pub code: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Unset priorities are reported under the "Undefined" bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    #[serde(default)]
    pub status: RequirementStatus,

    /// IDs of the test cases verifying this requirement
    #[serde(default)]
    pub linked_test_cases: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub history: Vec<HistoryEntry>,

    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Requirement {
    /// Creates a requirement with the given code and no links
    pub fn new(code: impl Into<String>, name: impl Into<String>, priority: Option<Priority>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            description: String::new(),
            priority,
            status: RequirementStatus::Draft,
            linked_test_cases: BTreeSet::new(),
            tags: Vec::new(),
            history: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Formats the code for the n-th requirement of a project
    pub fn format_code(number: u32) -> String {
        format!("REQ-{:0width$}", number, width = REQUIREMENT_CODE_WIDTH)
    }

    /// Appends an audit entry and bumps the modification time
    pub fn record(&mut self, action: HistoryAction, actor: &str, details: impl Into<String>) {
        let now = Utc::now();
        self.history.push(HistoryEntry {
            action,
            timestamp: now,
            actor: actor.to_string(),
            details: details.into(),
        });
        self.modified_at = now;
    }

    /// Matches either the requirement code or its UUID
    pub fn matches_reference(&self, reference: &str) -> bool {
        self.code.eq_ignore_ascii_case(reference) || self.id.to_string() == reference
    }
}

/// A single verifiable scenario belonging to a suite
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    /// Identifier, unique within the owning suite
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    #[serde(rename = "type", default)]
    pub test_type: TestType,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,

    #[serde(default)]
    pub prerequisites: String,

    #[serde(default)]
    pub expected_result: String,

    /// Absent means the case has never been executed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution_status: Option<ExecutionStatus>,
}

impl TestCase {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            priority: None,
            test_type: TestType::Manual,
            steps: Vec::new(),
            prerequisites: String::new(),
            expected_result: String::new(),
            last_execution_status: None,
        }
    }

    pub fn with_type(mut self, test_type: TestType) -> Self {
        self.test_type = test_type;
        self
    }

    pub fn with_status(mut self, status: Option<ExecutionStatus>) -> Self {
        self.last_execution_status = status;
        self
    }
}

/// Aggregate statistics kept on a suite
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SuiteStats {
    pub total: usize,
    pub pass_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<DateTime<Utc>>,
    pub automation_rate: f64,
}

/// An ordered collection of test cases owned by a project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestSuite {
    pub id: Uuid,
    pub name: String,
    pub project: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub stats: SuiteStats,
}

impl TestSuite {
    pub fn new(name: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            project: project.into(),
            test_cases: Vec::new(),
            stats: SuiteStats::default(),
        }
    }

    pub fn with_cases(mut self, cases: Vec<TestCase>) -> Self {
        self.test_cases = cases;
        self.refresh_stats(None);
        self
    }

    pub fn find_case(&self, id: &str) -> Option<&TestCase> {
        self.test_cases.iter().find(|c| c.id == id)
    }

    pub fn matches_reference(&self, reference: &str) -> bool {
        self.name == reference || self.id.to_string() == reference
    }

    /// Recomputes the aggregate statistics from the case list.
    /// `last_execution` only ever moves forward.
    pub fn refresh_stats(&mut self, last_execution: Option<DateTime<Utc>>) {
        let total = self.test_cases.len();
        let executed = self
            .test_cases
            .iter()
            .filter(|c| c.last_execution_status.is_some())
            .count();
        let passed = self
            .test_cases
            .iter()
            .filter(|c| c.last_execution_status == Some(ExecutionStatus::Passed))
            .count();
        let automated = self
            .test_cases
            .iter()
            .filter(|c| c.test_type == TestType::Automated)
            .count();

        self.stats.total = total;
        self.stats.pass_rate = percent(passed, executed);
        self.stats.automation_rate = percent(automated, total);
        if let Some(at) = last_execution {
            let newest = self.stats.last_execution.map_or(at, |prev| prev.max(at));
            self.stats.last_execution = Some(newest);
        }
    }
}

/// Result of one test case inside an execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    pub test_case_id: String,
    pub status: ResultStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl ExecutionResult {
    pub fn new(test_case_id: impl Into<String>, status: ResultStatus) -> Self {
        Self {
            test_case_id: test_case_id.into(),
            status,
            notes: String::new(),
        }
    }
}

/// Per-status counts of an execution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ExecutionSummary {
    pub passed: usize,
    pub failed: usize,
    pub blocked: usize,
    pub skipped: usize,
}

impl ExecutionSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.blocked + self.skipped
    }
}

/// A finalized run of a suite. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Execution {
    pub id: Uuid,
    pub suite_id: Uuid,
    pub environment: String,
    pub executed_at: DateTime<Utc>,
    pub executor: String,
    pub results: Vec<ExecutionResult>,
    pub summary: ExecutionSummary,
}

impl Execution {
    pub(crate) fn new(
        suite_id: Uuid,
        environment: String,
        executor: String,
        results: Vec<ExecutionResult>,
        executed_at: DateTime<Utc>,
    ) -> Self {
        let mut summary = ExecutionSummary::default();
        for result in &results {
            match result.status {
                ResultStatus::Passed => summary.passed += 1,
                ResultStatus::Failed => summary.failed += 1,
                ResultStatus::Blocked => summary.blocked += 1,
                ResultStatus::Skipped => summary.skipped += 1,
            }
        }

        Self {
            id: Uuid::new_v4(),
            suite_id,
            environment,
            executed_at,
            executor,
            results,
            summary,
        }
    }
}

/// Project-level test counters, derived from suites and execution records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProjectCounters {
    pub total_tests_count: usize,
    pub executed_tests_count: usize,
    pub pass_count: usize,
    pub fail_count: usize,
    pub automated_tests_count: usize,
}

impl ProjectCounters {
    /// Recomputes the counters from source records.
    ///
    /// The newest non-skipped execution result of a case decides its status;
    /// cases without one fall back to `last_execution_status`.
    pub fn derive(suites: &[TestSuite], executions: &[Execution]) -> Self {
        let mut latest: HashMap<(Uuid, &str), (DateTime<Utc>, ExecutionStatus)> = HashMap::new();
        for execution in executions {
            for result in &execution.results {
                let Some(status) = result.status.terminal() else {
                    continue;
                };
                let key = (execution.suite_id, result.test_case_id.as_str());
                let newer = latest
                    .get(&key)
                    .map_or(true, |(at, _)| execution.executed_at >= *at);
                if newer {
                    latest.insert(key, (execution.executed_at, status));
                }
            }
        }

        let mut counters = ProjectCounters::default();
        for suite in suites {
            for case in &suite.test_cases {
                counters.total_tests_count += 1;
                if case.test_type == TestType::Automated {
                    counters.automated_tests_count += 1;
                }

                let status = latest
                    .get(&(suite.id, case.id.as_str()))
                    .map(|(_, status)| *status)
                    .or(case.last_execution_status);
                match status {
                    Some(ExecutionStatus::Passed) => {
                        counters.executed_tests_count += 1;
                        counters.pass_count += 1;
                    }
                    Some(ExecutionStatus::Failed) => {
                        counters.executed_tests_count += 1;
                        counters.fail_count += 1;
                    }
                    Some(ExecutionStatus::Blocked) => counters.executed_tests_count += 1,
                    None => {}
                }
            }
        }
        counters
    }
}

/// Everything the engine needs about one project, captured at a point in time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProjectSnapshot {
    pub project: String,
    pub requirements: Vec<Requirement>,
    pub suites: Vec<TestSuite>,
    #[serde(default)]
    pub executions: Vec<Execution>,
}

impl ProjectSnapshot {
    pub fn counters(&self) -> ProjectCounters {
        ProjectCounters::derive(&self.suites, &self.executions)
    }
}

/// `(numerator / denominator) * 100`, or 0 when the denominator is 0
pub fn percent(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        (numerator as f64 / denominator as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_mapping_table() {
        assert_eq!("Critical".parse::<Priority>().unwrap(), Priority::Critical);
        assert_eq!("Crítica".parse::<Priority>().unwrap(), Priority::Critical);
        assert_eq!("alta".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" Media ".parse::<Priority>().unwrap(), Priority::Medium);
        assert_eq!("BAJA".parse::<Priority>().unwrap(), Priority::Low);

        let err = "Hihg".parse::<Priority>().unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { field: "priority", .. }));
    }

    #[test]
    fn test_priority_deserializes_locale_aliases() {
        let p: Priority = serde_yaml::from_str("Alta").unwrap();
        assert_eq!(p, Priority::High);
        let p: Priority = serde_yaml::from_str("Crítica").unwrap();
        assert_eq!(p, Priority::Critical);
        assert!(serde_yaml::from_str::<Priority>("Urgent").is_err());
    }

    #[test]
    fn test_priority_label() {
        assert_eq!(Priority::label(Some(Priority::High)), "High");
        assert_eq!(Priority::label(None), UNDEFINED_LABEL);
    }

    #[test]
    fn test_requirement_code_format() {
        assert_eq!(Requirement::format_code(1), "REQ-001");
        assert_eq!(Requirement::format_code(42), "REQ-042");
        assert_eq!(Requirement::format_code(1234), "REQ-1234");
    }

    #[test]
    fn test_requirement_record_appends_history() {
        let mut req = Requirement::new("REQ-001", "Login", Some(Priority::High));
        req.record(HistoryAction::Linked, "ana", "Linked test case TC-1");
        assert_eq!(req.history.len(), 1);
        assert_eq!(req.history[0].action, HistoryAction::Linked);
        assert_eq!(req.history[0].actor, "ana");
        assert!(req.matches_reference("req-001"));
        assert!(req.matches_reference(&req.id.to_string()));
    }

    #[test]
    fn test_percent_zero_denominator() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(3, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }

    #[test]
    fn test_suite_stats_refresh() {
        let suite = TestSuite::new("Smoke", "alpha").with_cases(vec![
            TestCase::new("TC-1", "a")
                .with_type(TestType::Automated)
                .with_status(Some(ExecutionStatus::Passed)),
            TestCase::new("TC-2", "b").with_status(Some(ExecutionStatus::Failed)),
            TestCase::new("TC-3", "c"),
            TestCase::new("TC-4", "d").with_type(TestType::Automated),
        ]);

        assert_eq!(suite.stats.total, 4);
        assert_eq!(suite.stats.pass_rate, 50.0);
        assert_eq!(suite.stats.automation_rate, 50.0);
        assert!(suite.stats.last_execution.is_none());
    }

    #[test]
    fn test_execution_summary_counts() {
        let execution = Execution::new(
            Uuid::new_v4(),
            "staging".to_string(),
            "ana".to_string(),
            vec![
                ExecutionResult::new("TC-1", ResultStatus::Passed),
                ExecutionResult::new("TC-2", ResultStatus::Failed),
                ExecutionResult::new("TC-3", ResultStatus::Skipped),
                ExecutionResult::new("TC-4", ResultStatus::Passed),
            ],
            Utc::now(),
        );
        assert_eq!(execution.summary.passed, 2);
        assert_eq!(execution.summary.failed, 1);
        assert_eq!(execution.summary.skipped, 1);
        assert_eq!(execution.summary.total(), 4);
    }

    #[test]
    fn test_counters_prefer_newest_execution() {
        let suite = TestSuite::new("Smoke", "alpha").with_cases(vec![
            TestCase::new("TC-1", "a")
                .with_type(TestType::Automated)
                .with_status(Some(ExecutionStatus::Passed)),
            TestCase::new("TC-2", "b").with_status(Some(ExecutionStatus::Blocked)),
            TestCase::new("TC-3", "c"),
        ]);
        let earlier = Utc::now() - chrono::Duration::hours(2);
        let later = Utc::now();
        let executions = vec![
            Execution::new(
                suite.id,
                "ci".into(),
                "bot".into(),
                vec![ExecutionResult::new("TC-1", ResultStatus::Failed)],
                later,
            ),
            Execution::new(
                suite.id,
                "ci".into(),
                "bot".into(),
                vec![
                    ExecutionResult::new("TC-1", ResultStatus::Passed),
                    ExecutionResult::new("TC-3", ResultStatus::Skipped),
                ],
                earlier,
            ),
        ];

        let counters = ProjectCounters::derive(&[suite], &executions);
        assert_eq!(counters.total_tests_count, 3);
        assert_eq!(counters.automated_tests_count, 1);
        // TC-1 failed most recently, TC-2 falls back to Blocked, TC-3 was only skipped
        assert_eq!(counters.executed_tests_count, 2);
        assert_eq!(counters.pass_count, 0);
        assert_eq!(counters.fail_count, 1);
    }
}
