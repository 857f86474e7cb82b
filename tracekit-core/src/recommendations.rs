//! Rule-based recommendations
//!
//! Every rule is evaluated independently and all matching rules fire. The
//! resulting list is stably sorted so that critical findings come first
//! while findings of equal type keep their generation order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::coverage::CoverageSummary;
use crate::models::Priority;
use crate::quality::QualityMetrics;
use crate::risk::RiskAssessment;

const COVERAGE_TARGET: f64 = 70.0;
const PRIORITY_COVERAGE_TARGET: f64 = 80.0;
const AUTOMATION_TARGET: f64 = 30.0;
const PASS_RATE_TARGET: f64 = 80.0;

/// Urgency of a recommendation. Declaration order is sort order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationType::Critical => write!(f, "critical"),
            RecommendationType::High => write!(f, "high"),
            RecommendationType::Medium => write!(f, "medium"),
            RecommendationType::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationArea {
    Coverage,
    Execution,
    Automation,
    Security,
}

impl fmt::Display for RecommendationArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationArea::Coverage => write!(f, "coverage"),
            RecommendationArea::Execution => write!(f, "execution"),
            RecommendationArea::Automation => write!(f, "automation"),
            RecommendationArea::Security => write!(f, "security"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub area: RecommendationArea,
    pub message: String,
    pub details: String,
}

impl Recommendation {
    pub fn new(
        kind: RecommendationType,
        area: RecommendationArea,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            area,
            message: message.into(),
            details: details.into(),
        }
    }
}

/// Stable sort by type: critical, high, medium, low
pub fn sort_by_priority(recommendations: &mut [Recommendation]) {
    recommendations.sort_by_key(|r| r.kind);
}

fn requirements_noun(count: usize) -> &'static str {
    if count == 1 {
        "requirement"
    } else {
        "requirements"
    }
}

fn code_list<'a>(codes: impl Iterator<Item = &'a str>) -> String {
    codes.collect::<Vec<_>>().join(", ")
}

pub fn generate(
    coverage: &CoverageSummary,
    risk: &RiskAssessment,
    quality: &QualityMetrics,
) -> Vec<Recommendation> {
    if coverage.total_requirements == 0 {
        return Vec::new();
    }

    let mut recommendations = Vec::new();

    if risk.critical_uncovered_count > 0 {
        let count = risk.critical_uncovered_count;
        recommendations.push(Recommendation::new(
            RecommendationType::High,
            RecommendationArea::Coverage,
            format!(
                "{} critical {} without linked test cases",
                count,
                requirements_noun(count)
            ),
            format!(
                "Link test cases to the uncovered high-priority requirements: {}",
                code_list(risk.critical_uncovered.iter().map(|r| r.code.as_str()))
            ),
        ));
    }

    if risk.critical_failing_count > 0 {
        let count = risk.critical_failing_count;
        recommendations.push(Recommendation::new(
            RecommendationType::Critical,
            RecommendationArea::Execution,
            format!(
                "{} critical {} with failing tests",
                count,
                requirements_noun(count)
            ),
            format!(
                "Fix the failing tests before release: {}",
                code_list(risk.critical_failing.iter().map(|f| f.requirement.code.as_str()))
            ),
        ));
    }

    if coverage.coverage_percent < COVERAGE_TARGET {
        recommendations.push(Recommendation::new(
            RecommendationType::Medium,
            RecommendationArea::Coverage,
            format!(
                "Requirements coverage is {:.1}%, below the {:.0}% target",
                coverage.coverage_percent, COVERAGE_TARGET
            ),
            format!(
                "{} of {} requirements have at least one linked test case",
                coverage.covered_requirements, coverage.total_requirements
            ),
        ));
    }

    for priority in [Priority::Critical, Priority::High] {
        let Some(bucket) = coverage.bucket(priority) else {
            continue;
        };
        if bucket.coverage_percent < PRIORITY_COVERAGE_TARGET {
            recommendations.push(Recommendation::new(
                RecommendationType::High,
                RecommendationArea::Coverage,
                format!(
                    "{} priority coverage is {:.1}%, below the {:.0}% target",
                    priority, bucket.coverage_percent, PRIORITY_COVERAGE_TARGET
                ),
                format!(
                    "{} of {} {} priority requirements are covered",
                    bucket.covered, bucket.total, priority
                ),
            ));
        }
    }

    if quality.automation.automation_rate < AUTOMATION_TARGET {
        recommendations.push(Recommendation::new(
            RecommendationType::Low,
            RecommendationArea::Automation,
            format!(
                "Test automation rate is {:.1}%, below the {:.0}% target",
                quality.automation.automation_rate, AUTOMATION_TARGET
            ),
            format!(
                "{} of {} test cases are automated",
                quality.automation.automated_tests, quality.automation.total_tests
            ),
        ));
    }

    if coverage.pass_rate < PASS_RATE_TARGET && coverage.covered_requirements > 0 {
        recommendations.push(Recommendation::new(
            RecommendationType::Medium,
            RecommendationArea::Execution,
            format!(
                "Requirement pass rate is {:.1}%, below the {:.0}% target",
                coverage.pass_rate, PASS_RATE_TARGET
            ),
            format!(
                "{} of {} covered requirements pass all executed tests",
                coverage.passed_requirements, coverage.covered_requirements
            ),
        ));
    }

    sort_by_priority(&mut recommendations);
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::summarize;
    use crate::matrix::build_matrix;
    use crate::matrix::tests::{case, requirement, snapshot};
    use crate::models::{ExecutionStatus, ProjectCounters, TestType};
    use crate::quality::evaluate;
    use crate::risk::assess;

    fn generate_for(snap: &crate::models::ProjectSnapshot) -> Vec<Recommendation> {
        let matrix = build_matrix(snap);
        let coverage = summarize(&matrix);
        let risk = assess(&matrix);
        let quality = evaluate(&coverage, &snap.counters());
        generate(&coverage, &risk, &quality)
    }

    #[test]
    fn test_sort_keeps_generation_order_within_type() {
        let mut recs = vec![
            Recommendation::new(RecommendationType::Low, RecommendationArea::Automation, "low", ""),
            Recommendation::new(RecommendationType::High, RecommendationArea::Coverage, "first", ""),
            Recommendation::new(RecommendationType::Critical, RecommendationArea::Execution, "crit", ""),
            Recommendation::new(RecommendationType::High, RecommendationArea::Coverage, "second", ""),
        ];
        sort_by_priority(&mut recs);

        let messages: Vec<_> = recs.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["crit", "first", "second", "low"]);
    }

    #[test]
    fn test_critical_sorted_before_low() {
        let mut recs = vec![
            Recommendation::new(RecommendationType::Low, RecommendationArea::Automation, "low", ""),
            Recommendation::new(RecommendationType::Critical, RecommendationArea::Execution, "crit", ""),
        ];
        sort_by_priority(&mut recs);
        assert_eq!(recs[0].kind, RecommendationType::Critical);
        assert_eq!(recs[1].kind, RecommendationType::Low);
    }

    #[test]
    fn test_no_requirements_no_recommendations() {
        let recs = generate_for(&snapshot(Vec::new(), vec![case("TC-1", None)]));
        assert!(recs.is_empty());
    }

    #[test]
    fn test_healthy_project_has_no_findings() {
        let snap = snapshot(
            vec![
                requirement("REQ-001", Some(Priority::Critical), &["TC-1"]),
                requirement("REQ-002", Some(Priority::High), &["TC-2"]),
            ],
            vec![
                case("TC-1", Some(ExecutionStatus::Passed)).with_type(TestType::Automated),
                case("TC-2", Some(ExecutionStatus::Passed)),
            ],
        );
        assert!(generate_for(&snap).is_empty());
    }

    #[test]
    fn test_all_rules_fire_in_priority_order() {
        let snap = snapshot(
            vec![
                requirement("REQ-001", Some(Priority::Critical), &[]),
                requirement("REQ-002", Some(Priority::High), &["TC-1"]),
                requirement("REQ-003", Some(Priority::Low), &[]),
            ],
            vec![case("TC-1", Some(ExecutionStatus::Failed))],
        );

        let recs = generate_for(&snap);
        let kinds: Vec<_> = recs.iter().map(|r| (r.kind, r.area)).collect();
        assert_eq!(
            kinds,
            vec![
                (RecommendationType::Critical, RecommendationArea::Execution),
                (RecommendationType::High, RecommendationArea::Coverage),
                (RecommendationType::High, RecommendationArea::Coverage),
                (RecommendationType::Medium, RecommendationArea::Coverage),
                (RecommendationType::Medium, RecommendationArea::Execution),
                (RecommendationType::Low, RecommendationArea::Automation),
            ]
        );
        assert_eq!(recs[0].message, "1 critical requirement with failing tests");
        assert!(recs[1].message.starts_with("1 critical requirement without"));
        assert!(recs[2].message.starts_with("Critical priority coverage is 0.0%"));
    }

    #[test]
    fn test_pass_rate_rule_needs_coverage() {
        let coverage = CoverageSummary {
            total_requirements: 3,
            coverage_percent: 100.0,
            ..Default::default()
        };
        let risk = assess(&[]);
        let mut quality = evaluate(&coverage, &ProjectCounters::default());
        quality.automation.automation_rate = 100.0;

        let recs = generate(&coverage, &risk, &quality);
        assert!(recs.iter().all(|r| r.area != RecommendationArea::Execution));
    }
}
