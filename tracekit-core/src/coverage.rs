//! Coverage aggregation over a traceability matrix

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::matrix::CoverageRow;
use crate::models::{percent, Priority};

/// Coverage figures for one priority bucket
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PriorityCoverage {
    pub total: usize,
    pub covered: usize,
    pub passed: usize,
    pub coverage_percent: f64,
    pub pass_percent: f64,
}

/// Project-wide coverage summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CoverageSummary {
    pub total_requirements: usize,
    pub covered_requirements: usize,
    pub coverage_percent: f64,
    pub passed_requirements: usize,
    /// Passed requirements over covered requirements
    pub pass_rate: f64,
    /// Keyed by priority label, "Undefined" for unset priorities
    pub priority_coverage: BTreeMap<String, PriorityCoverage>,
}

impl CoverageSummary {
    pub fn bucket(&self, priority: Priority) -> Option<&PriorityCoverage> {
        self.priority_coverage.get(&priority.to_string())
    }
}

fn is_passed(row: &CoverageRow) -> bool {
    row.pass_rate >= 100.0
}

/// Reduces the matrix into project and per-priority figures
pub fn summarize(matrix: &[CoverageRow]) -> CoverageSummary {
    let total_requirements = matrix.len();
    let covered_requirements = matrix.iter().filter(|r| r.is_covered()).count();
    let passed_requirements = matrix.iter().filter(|r| is_passed(r)).count();

    let mut priority_coverage: BTreeMap<String, PriorityCoverage> = BTreeMap::new();
    for row in matrix {
        let bucket = priority_coverage.entry(Priority::label(row.priority())).or_default();
        bucket.total += 1;
        if row.is_covered() {
            bucket.covered += 1;
        }
        if is_passed(row) {
            bucket.passed += 1;
        }
    }
    for bucket in priority_coverage.values_mut() {
        bucket.coverage_percent = percent(bucket.covered, bucket.total);
        bucket.pass_percent = percent(bucket.passed, bucket.total);
    }

    CoverageSummary {
        total_requirements,
        covered_requirements,
        coverage_percent: percent(covered_requirements, total_requirements),
        passed_requirements,
        pass_rate: percent(passed_requirements, covered_requirements),
        priority_coverage,
    }
}
