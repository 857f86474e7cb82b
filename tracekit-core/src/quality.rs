//! Quality scores on a 0-5 scale
//!
//! Each dimension normalizes a raw percentage against its target:
//! `score = clamp(value / (target * scale) * 5, 0, 5)`. Automation uses a
//! scale of 0.8 so that 80% automation already earns the full score.

use serde::{Deserialize, Serialize};

use crate::coverage::CoverageSummary;
use crate::models::{percent, ProjectCounters};

pub const MAX_SCORE: f64 = 5.0;

/// Target value a dimension is measured against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreTarget {
    pub target: f64,
    pub scale: f64,
}

pub const REQUIREMENTS_TARGET: ScoreTarget = ScoreTarget {
    target: 100.0,
    scale: 1.0,
};

pub const TESTING_TARGET: ScoreTarget = ScoreTarget {
    target: 100.0,
    scale: 1.0,
};

pub const AUTOMATION_TARGET: ScoreTarget = ScoreTarget {
    target: 100.0,
    scale: 0.8,
};

/// Normalizes `value` into [0, 5]. Negative and NaN inputs count as 0.
pub fn quality_score(value: f64, target: ScoreTarget) -> f64 {
    let value = if value.is_nan() || value < 0.0 { 0.0 } else { value };
    let ceiling = target.target * target.scale;
    if ceiling <= 0.0 {
        return 0.0;
    }
    (value / ceiling * MAX_SCORE).clamp(0.0, MAX_SCORE)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequirementsQuality {
    pub total_requirements: usize,
    pub covered_requirements: usize,
    pub coverage_percent: f64,
    pub quality_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestingQuality {
    pub total_tests: usize,
    pub executed_tests: usize,
    pub execution_rate: f64,
    pub pass_count: usize,
    pub fail_count: usize,
    /// Passed over executed tests
    pub pass_rate: f64,
    pub quality_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutomationQuality {
    pub total_tests: usize,
    pub automated_tests: usize,
    pub automation_rate: f64,
    pub quality_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityMetrics {
    pub requirements: RequirementsQuality,
    pub testing: TestingQuality,
    pub automation: AutomationQuality,
    /// Unweighted mean of the three dimension scores
    pub overall_quality_score: f64,
}

pub fn evaluate(coverage: &CoverageSummary, counters: &ProjectCounters) -> QualityMetrics {
    let requirements = RequirementsQuality {
        total_requirements: coverage.total_requirements,
        covered_requirements: coverage.covered_requirements,
        coverage_percent: coverage.coverage_percent,
        quality_score: quality_score(coverage.coverage_percent, REQUIREMENTS_TARGET),
    };

    let pass_rate = percent(counters.pass_count, counters.executed_tests_count);
    let testing = TestingQuality {
        total_tests: counters.total_tests_count,
        executed_tests: counters.executed_tests_count,
        execution_rate: percent(counters.executed_tests_count, counters.total_tests_count),
        pass_count: counters.pass_count,
        fail_count: counters.fail_count,
        pass_rate,
        quality_score: quality_score(pass_rate, TESTING_TARGET),
    };

    let automation_rate = percent(counters.automated_tests_count, counters.total_tests_count);
    let automation = AutomationQuality {
        total_tests: counters.total_tests_count,
        automated_tests: counters.automated_tests_count,
        automation_rate,
        quality_score: quality_score(automation_rate, AUTOMATION_TARGET),
    };

    let overall_quality_score =
        (requirements.quality_score + testing.quality_score + automation.quality_score) / 3.0;

    QualityMetrics {
        requirements,
        testing,
        automation,
        overall_quality_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(total: usize, covered: usize) -> CoverageSummary {
        CoverageSummary {
            total_requirements: total,
            covered_requirements: covered,
            coverage_percent: percent(covered, total),
            ..Default::default()
        }
    }

    #[test]
    fn test_score_scaling() {
        assert_eq!(quality_score(100.0, REQUIREMENTS_TARGET), 5.0);
        assert_eq!(quality_score(50.0, REQUIREMENTS_TARGET), 2.5);
        assert_eq!(quality_score(0.0, TESTING_TARGET), 0.0);
        assert!((quality_score(80.0, AUTOMATION_TARGET) - 5.0).abs() < 1e-12);
        assert!((quality_score(40.0, AUTOMATION_TARGET) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_score_clamping() {
        assert_eq!(quality_score(150.0, AUTOMATION_TARGET), 5.0);
        assert_eq!(quality_score(1_000.0, REQUIREMENTS_TARGET), 5.0);
        assert_eq!(quality_score(-20.0, TESTING_TARGET), 0.0);
        assert_eq!(quality_score(f64::NAN, TESTING_TARGET), 0.0);
    }

    #[test]
    fn test_malformed_automation_counters_clamp() {
        let counters = ProjectCounters {
            total_tests_count: 2,
            automated_tests_count: 3,
            ..Default::default()
        };
        let metrics = evaluate(&coverage(0, 0), &counters);
        assert_eq!(metrics.automation.automation_rate, 150.0);
        assert_eq!(metrics.automation.quality_score, 5.0);
    }

    #[test]
    fn test_overall_is_unweighted_mean() {
        let counters = ProjectCounters {
            total_tests_count: 10,
            executed_tests_count: 10,
            pass_count: 5,
            fail_count: 5,
            automated_tests_count: 0,
        };
        let metrics = evaluate(&coverage(4, 4), &counters);

        assert_eq!(metrics.requirements.quality_score, 5.0);
        assert_eq!(metrics.testing.pass_rate, 50.0);
        assert_eq!(metrics.testing.execution_rate, 100.0);
        assert_eq!(metrics.testing.quality_score, 2.5);
        assert_eq!(metrics.automation.quality_score, 0.0);
        assert!((metrics.overall_quality_score - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_project_scores_zero() {
        let metrics = evaluate(&coverage(0, 0), &ProjectCounters::default());
        assert_eq!(metrics.overall_quality_score, 0.0);
        assert_eq!(metrics.testing.pass_rate, 0.0);
    }
}
