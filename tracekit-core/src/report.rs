//! Report assembly
//!
//! A report runs the whole pipeline over one project snapshot: matrix,
//! coverage, risk, quality and recommendations. Every section is computed
//! from the same snapshot; the options only decide which sections are kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::coverage::{summarize, CoverageSummary};
use crate::db::{ProjectBackend, ReportStore};
use crate::error::{EngineError, EngineResult};
use crate::matrix::{build_matrix, row_for, CoverageRow};
use crate::models::ProjectSnapshot;
use crate::quality::{evaluate, QualityMetrics};
use crate::recommendations::{generate, Recommendation};
use crate::risk::{assess, RiskAssessment};

/// Which sections a report carries and whether it is persisted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportOptions {
    pub include_metrics: bool,
    pub include_risk_analysis: bool,
    pub include_coverage_analysis: bool,
    /// Preview reports are never persisted
    pub preview: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_metrics: true,
            include_risk_analysis: true,
            include_coverage_analysis: true,
            preview: false,
        }
    }
}

/// An assembled report. Apart from `generated_at` its content is a pure
/// function of the snapshot and options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub project: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_matrix: Option<Vec<CoverageRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityMetrics>,
    pub recommendations: Vec<Recommendation>,
}

/// A report as kept by a `ReportStore`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredReport {
    pub id: Uuid,
    pub stored_at: DateTime<Utc>,
    pub report: Report,
}

impl StoredReport {
    pub fn new(report: Report) -> Self {
        Self {
            id: Uuid::new_v4(),
            stored_at: Utc::now(),
            report,
        }
    }
}

/// Runs the pipeline over a snapshot
pub fn assemble(
    snapshot: &ProjectSnapshot,
    options: &ReportOptions,
    generated_at: DateTime<Utc>,
) -> Report {
    let matrix = build_matrix(snapshot);
    let coverage = summarize(&matrix);
    let risk = assess(&matrix);
    let quality = evaluate(&coverage, &snapshot.counters());
    let recommendations = generate(&coverage, &risk, &quality);

    debug!(
        project = %snapshot.project,
        rows = matrix.len(),
        covered = coverage.covered_requirements,
        risk = %risk.risk_level,
        recommendations = recommendations.len(),
        "Assembled report sections"
    );

    let (coverage_matrix, coverage) = if options.include_coverage_analysis {
        (Some(matrix), Some(coverage))
    } else {
        (None, None)
    };

    Report {
        project: snapshot.project.clone(),
        generated_at,
        coverage_matrix,
        coverage,
        risk: options.include_risk_analysis.then_some(risk),
        quality: options.include_metrics.then_some(quality),
        recommendations,
    }
}

/// Result of `ReportAssembler::generate`
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub report: Report,
    /// Id under which the report was stored, if it was
    pub stored: Option<Uuid>,
}

/// Ties the pipeline to a project backend and an optional report store
pub struct ReportAssembler<'a> {
    backend: &'a dyn ProjectBackend,
    store: Option<&'a dyn ReportStore>,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(backend: &'a dyn ProjectBackend) -> Self {
        Self {
            backend,
            store: None,
        }
    }

    pub fn with_store(mut self, store: &'a dyn ReportStore) -> Self {
        self.store = Some(store);
        self
    }

    fn snapshot(&self, project: &str) -> EngineResult<ProjectSnapshot> {
        self.backend
            .snapshot(project)?
            .ok_or_else(|| EngineError::not_found("Project", project))
    }

    /// Builds a report for `project` and stores it unless it is a preview
    pub fn generate(&self, project: &str, options: &ReportOptions) -> EngineResult<ReportOutcome> {
        let snapshot = self.snapshot(project)?;
        let report = assemble(&snapshot, options, Utc::now());

        let stored = match self.store {
            Some(store) if !options.preview => {
                let stored = store.save_report(&report)?;
                info!(project, report_id = %stored.id, "Stored report");
                Some(stored.id)
            }
            _ => None,
        };

        info!(
            project,
            preview = options.preview,
            recommendations = report.recommendations.len(),
            "Generated report"
        );
        Ok(ReportOutcome { report, stored })
    }

    /// The full traceability matrix of a project
    pub fn matrix(&self, project: &str) -> EngineResult<Vec<CoverageRow>> {
        Ok(build_matrix(&self.snapshot(project)?))
    }

    /// The matrix row of a single requirement
    pub fn row(&self, project: &str, requirement: &str) -> EngineResult<CoverageRow> {
        row_for(&self.snapshot(project)?, requirement)
    }

    pub fn coverage(&self, project: &str) -> EngineResult<CoverageSummary> {
        Ok(summarize(&self.matrix(project)?))
    }

    /// Stored reports of a project, newest first. Empty without a store.
    pub fn history(&self, project: &str) -> EngineResult<Vec<StoredReport>> {
        match self.store {
            Some(store) => Ok(store.list_reports(project)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn load(&self, id: &Uuid) -> EngineResult<StoredReport> {
        let found = match self.store {
            Some(store) => store.get_report(id)?,
            None => None,
        };
        found.ok_or_else(|| EngineError::not_found("Report", id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::YamlBackend;
    use crate::matrix::tests::{case, requirement, snapshot};
    use crate::models::{ExecutionStatus, Priority};
    use crate::recommendations::{RecommendationArea, RecommendationType};
    use crate::risk::RiskLevel;
    use crate::store::ProjectStore;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    /// Critical, High, Medium and Low requirements; only Medium is linked,
    /// to one passing and one failing case
    fn mixed_snapshot() -> ProjectSnapshot {
        snapshot(
            vec![
                requirement("REQ-001", Some(Priority::Critical), &[]),
                requirement("REQ-002", Some(Priority::High), &[]),
                requirement("REQ-003", Some(Priority::Medium), &["TC-1", "TC-2"]),
                requirement("REQ-004", Some(Priority::Low), &[]),
            ],
            vec![
                case("TC-1", Some(ExecutionStatus::Passed)),
                case("TC-2", Some(ExecutionStatus::Failed)),
            ],
        )
    }

    #[test]
    fn test_end_to_end_mixed_project() {
        let report = assemble(&mixed_snapshot(), &ReportOptions::default(), fixed_time());

        let coverage = report.coverage.as_ref().unwrap();
        assert_eq!(coverage.covered_requirements, 1);
        assert_eq!(coverage.coverage_percent, 25.0);

        let risk = report.risk.as_ref().unwrap();
        assert_eq!(risk.critical_uncovered_count, 2);
        assert_eq!(risk.critical_failing_count, 0);
        assert!((risk.risk_score - 0.30).abs() < 1e-12);
        assert_eq!(risk.risk_level, RiskLevel::Critical);

        assert!(report.recommendations.iter().any(|r| {
            r.kind == RecommendationType::High
                && r.area == RecommendationArea::Coverage
                && r.message.contains("2 critical requirements")
        }));
        assert_eq!(report.coverage_matrix.as_ref().unwrap().len(), 4);
    }

    #[test]
    fn test_skipping_sections_leaves_others_unchanged() {
        let snap = mixed_snapshot();
        let full = assemble(&snap, &ReportOptions::default(), fixed_time());

        let options = ReportOptions {
            include_metrics: false,
            include_coverage_analysis: false,
            ..Default::default()
        };
        let partial = assemble(&snap, &options, fixed_time());

        assert!(partial.quality.is_none());
        assert!(partial.coverage.is_none());
        assert!(partial.coverage_matrix.is_none());
        assert_eq!(partial.risk, full.risk);
        assert_eq!(partial.recommendations, full.recommendations);
    }

    #[test]
    fn test_report_serialization_is_stable() {
        let report = assemble(&mixed_snapshot(), &ReportOptions::default(), fixed_time());
        let first = serde_json::to_string(&report).unwrap();
        let reparsed: Report = serde_json::from_str(&first).unwrap();
        assert_eq!(serde_json::to_string(&reparsed).unwrap(), first);
    }

    #[test]
    fn test_empty_project_report() {
        let report = assemble(&snapshot(Vec::new(), Vec::new()), &ReportOptions::default(), fixed_time());
        assert_eq!(report.risk.unwrap().risk_level, RiskLevel::Undefined);
        assert_eq!(report.coverage.unwrap().coverage_percent, 0.0);
        assert!(report.recommendations.is_empty());
    }

    fn backend_with_project(dir: &TempDir) -> YamlBackend {
        let backend = YamlBackend::new(dir.path());
        let mut store = ProjectStore::new("alpha");
        store.create_requirement("Login", "", Some(Priority::Critical), Vec::new(), "ana");
        backend.save(&store).unwrap();
        backend
    }

    #[test]
    fn test_generate_persists_unless_preview() {
        let dir = TempDir::new().unwrap();
        let backend = backend_with_project(&dir);
        let assembler = ReportAssembler::new(&backend).with_store(&backend);

        let preview = ReportOptions {
            preview: true,
            ..Default::default()
        };
        assert!(assembler.generate("alpha", &preview).unwrap().stored.is_none());
        assert!(assembler.history("alpha").unwrap().is_empty());

        let outcome = assembler.generate("alpha", &ReportOptions::default()).unwrap();
        let id = outcome.stored.unwrap();
        assert_eq!(assembler.history("alpha").unwrap().len(), 1);
        assert_eq!(assembler.load(&id).unwrap().report, outcome.report);
    }

    #[test]
    fn test_missing_project_and_report_are_not_found() {
        let dir = TempDir::new().unwrap();
        let backend = YamlBackend::new(dir.path());
        let assembler = ReportAssembler::new(&backend).with_store(&backend);

        let err = assembler.generate("ghost", &ReportOptions::default()).unwrap_err();
        assert!(err.is_not_found());
        assert!(assembler.load(&Uuid::new_v4()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_row_lookup_through_backend() {
        let dir = TempDir::new().unwrap();
        let backend = backend_with_project(&dir);
        let assembler = ReportAssembler::new(&backend);

        let row = assembler.row("alpha", "req-001").unwrap();
        assert_eq!(row.requirement.code, "REQ-001");
        assert!(!row.is_covered());
        assert!(assembler.row("alpha", "REQ-999").unwrap_err().is_not_found());
    }
}
