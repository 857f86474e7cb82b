//! Risk classification for High and Critical requirements
//!
//! The risk score weighs the share of high-priority requirements left
//! uncovered against the share of covered requirements with failing tests:
//!
//! ```text
//! score = 0.6 * uncovered / total + 0.4 * failing / covered
//! ```
//!
//! Thresholds are inclusive and evaluated from the most severe level down.
//! They are compared against the exact fraction rather than the rounded
//! `f64`, so a score of exactly 0.20 (one of three uncovered) is Critical.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::matrix::{CoverageRow, LinkedTestCase};
use crate::models::Requirement;

pub const UNCOVERED_WEIGHT: f64 = 0.6;
pub const FAILING_WEIGHT: f64 = 0.4;

// Score thresholds, in hundredths
const CRITICAL_SCORE: u64 = 20;
const HIGH_SCORE: u64 = 10;
const MEDIUM_SCORE: u64 = 5;
const CRITICAL_COUNT: usize = 3;
const HIGH_COUNT: usize = 1;

/// Categorical project risk
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    /// No requirements to judge
    Undefined,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
            RiskLevel::Critical => write!(f, "Critical"),
            RiskLevel::Undefined => write!(f, "Undefined"),
        }
    }
}

/// A high-priority requirement with at least one failing test
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailingRequirement {
    pub requirement: Requirement,
    pub failing_tests: Vec<LinkedTestCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub critical_uncovered_count: usize,
    pub critical_failing_count: usize,
    pub critical_uncovered: Vec<Requirement>,
    pub critical_failing: Vec<FailingRequirement>,
}

/// Weighted risk score; the failing term is 0 when nothing is covered
pub fn risk_score(uncovered: usize, failing: usize, total: usize, covered: usize) -> f64 {
    let uncovered_ratio = if total == 0 {
        0.0
    } else {
        uncovered as f64 / total as f64
    };
    let failing_ratio = if covered == 0 {
        0.0
    } else {
        failing as f64 / covered as f64
    };
    UNCOVERED_WEIGHT * uncovered_ratio + FAILING_WEIGHT * failing_ratio
}

/// Whether the score of these counts reaches `hundredths / 100`.
///
/// `score = (6uc + 4fn) / 10nc`, so the comparison is done on integers.
pub fn score_reaches(
    hundredths: u64,
    uncovered: usize,
    failing: usize,
    total: usize,
    covered: usize,
) -> bool {
    if total == 0 {
        return hundredths == 0;
    }
    let (failing, covered) = if covered == 0 {
        (0, 1)
    } else {
        (failing as u128, covered as u128)
    };
    let uncovered = uncovered as u128;
    let total = total as u128;
    let weighted = 6 * uncovered * covered + 4 * failing * total;
    10 * weighted >= u128::from(hundredths) * total * covered
}

/// Maps the counts to a level. First match wins.
pub fn classify(uncovered: usize, failing: usize, total: usize, covered: usize) -> RiskLevel {
    let reaches = |hundredths| score_reaches(hundredths, uncovered, failing, total, covered);
    if reaches(CRITICAL_SCORE) || uncovered >= CRITICAL_COUNT || failing >= CRITICAL_COUNT {
        RiskLevel::Critical
    } else if reaches(HIGH_SCORE) || uncovered >= HIGH_COUNT || failing >= HIGH_COUNT {
        RiskLevel::High
    } else if reaches(MEDIUM_SCORE) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn assess(matrix: &[CoverageRow]) -> RiskAssessment {
    let total = matrix.len();
    let covered = matrix.iter().filter(|r| r.is_covered()).count();

    let high_risk = matrix
        .iter()
        .filter(|r| r.priority().is_some_and(|p| p.is_high_risk()));

    let mut critical_uncovered = Vec::new();
    let mut critical_failing = Vec::new();
    for row in high_risk {
        if !row.is_covered() {
            critical_uncovered.push(row.requirement.clone());
            continue;
        }
        let failing = row.failing_tests();
        if !failing.is_empty() {
            critical_failing.push(FailingRequirement {
                requirement: row.requirement.clone(),
                failing_tests: failing.into_iter().cloned().collect(),
            });
        }
    }

    let uncovered_count = critical_uncovered.len();
    let failing_count = critical_failing.len();
    let score = risk_score(uncovered_count, failing_count, total, covered);
    let risk_level = if total == 0 {
        RiskLevel::Undefined
    } else {
        classify(uncovered_count, failing_count, total, covered)
    };

    RiskAssessment {
        risk_level,
        risk_score: score,
        critical_uncovered_count: uncovered_count,
        critical_failing_count: failing_count,
        critical_uncovered,
        critical_failing,
    }
}
