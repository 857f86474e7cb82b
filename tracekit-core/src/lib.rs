pub mod config;
pub mod coverage;
pub mod db;
pub mod error;
pub mod matrix;
pub mod models;
pub mod quality;
pub mod recommendations;
pub mod report;
pub mod risk;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use config::{get_config_path, Settings};
pub use coverage::{summarize, CoverageSummary, PriorityCoverage};
pub use db::{
    open_project_backend, open_report_store, BackendType, ProjectBackend, ReportStore,
    SqliteReportStore, YamlBackend,
};
pub use error::{EngineError, EngineResult};
pub use matrix::{build_matrix, row_for, CoverageRow, ExecutionBreakdown, LinkedTestCase, MatrixBuilder};
pub use models::{
    Execution, ExecutionResult, ExecutionStatus, ExecutionSummary, HistoryAction, HistoryEntry,
    Priority, ProjectCounters, ProjectSnapshot, Requirement, RequirementStatus, ResultStatus,
    SuiteStats, TestCase, TestSuite, TestType,
};
pub use quality::{evaluate, QualityMetrics};
pub use recommendations::{Recommendation, RecommendationArea, RecommendationType};
pub use report::{assemble, Report, ReportAssembler, ReportOptions, ReportOutcome, StoredReport};
pub use risk::{assess, RiskAssessment, RiskLevel};
pub use storage::Storage;
pub use store::{ProjectStore, RequirementUpdate};
