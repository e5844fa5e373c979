//! VALIDATE stage output and the deterministic quality-score formula.
//!
//! The score starts at [`MAX_SCORE`] and loses a fixed penalty for each
//! failed boolean check and for each reported error and warning. A report
//! passes when both boolean checks hold and the score reaches the run's
//! minimum.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{RunId, Timestamp};

pub const MAX_SCORE: i32 = 100;
pub const SYNTAX_PENALTY: i32 = 30;
pub const STRUCTURE_PENALTY: i32 = 20;
pub const ERROR_PENALTY: i32 = 5;
pub const WARNING_PENALTY: i32 = 2;

/// Raw findings gathered by the VALIDATE stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityFindings {
    pub syntax_valid: bool,
    pub structure_valid: bool,
    pub domain_compliant: bool,
    pub logic_preserved: bool,
    pub error_count: u32,
    pub warning_count: u32,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Compute the quality score for a set of findings, clamped to 0..=100.
pub fn quality_score(findings: &QualityFindings) -> i32 {
    let mut score = MAX_SCORE;
    if !findings.syntax_valid {
        score -= SYNTAX_PENALTY;
    }
    if !findings.structure_valid {
        score -= STRUCTURE_PENALTY;
    }
    let errors = i32::try_from(findings.error_count).unwrap_or(i32::MAX);
    let warnings = i32::try_from(findings.warning_count).unwrap_or(i32::MAX);
    score = score.saturating_sub(errors.saturating_mul(ERROR_PENALTY));
    score = score.saturating_sub(warnings.saturating_mul(WARNING_PENALTY));
    score.clamp(0, MAX_SCORE)
}

/// Validation outcome of a run. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub run_id: RunId,
    pub score: i32,
    pub passed: bool,
    pub syntax_valid: bool,
    pub structure_valid: bool,
    pub domain_compliant: bool,
    pub logic_preserved: bool,
    pub error_count: i32,
    pub warning_count: i32,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub created_at: Timestamp,
}

impl QualityReport {
    /// Score the findings and decide pass/fail against `min_score`.
    pub fn evaluate(run_id: RunId, findings: QualityFindings, min_score: i32) -> Self {
        let score = quality_score(&findings);
        let passed = findings.syntax_valid && findings.structure_valid && score >= min_score;
        Self {
            run_id,
            score,
            passed,
            syntax_valid: findings.syntax_valid,
            structure_valid: findings.structure_valid,
            domain_compliant: findings.domain_compliant,
            logic_preserved: findings.logic_preserved,
            error_count: i32::try_from(findings.error_count).unwrap_or(i32::MAX),
            warning_count: i32::try_from(findings.warning_count).unwrap_or(i32::MAX),
            issues: findings.issues,
            recommendations: findings.recommendations,
            created_at: Utc::now(),
        }
    }

    /// Names of the sub-checks that did not hold.
    pub fn failed_checks(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if !self.syntax_valid {
            failed.push("syntax");
        }
        if !self.structure_valid {
            failed.push("structure");
        }
        if !self.domain_compliant {
            failed.push("domain-compliance");
        }
        if !self.logic_preserved {
            failed.push("logic-preservation");
        }
        failed
    }

    /// Human-readable reason used when a failed report halts the run.
    pub fn failure_message(&self, min_score: i32) -> String {
        let failed = self.failed_checks();
        let checks = if failed.is_empty() {
            "none".to_string()
        } else {
            failed.join(", ")
        };
        format!(
            "Validation failed: score {} (minimum {min_score}); failed checks: {checks}; {} error(s), {} warning(s)",
            self.score, self.error_count, self.warning_count
        )
    }

    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "score": self.score,
            "passed": self.passed,
            "failed_checks": self.failed_checks(),
            "errors": self.error_count,
            "warnings": self.warning_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::new_run_id;

    fn clean() -> QualityFindings {
        QualityFindings {
            syntax_valid: true,
            structure_valid: true,
            domain_compliant: true,
            logic_preserved: true,
            ..Default::default()
        }
    }

    #[test]
    fn perfect_project_scores_full_marks() {
        assert_eq!(quality_score(&clean()), 100);
    }

    #[test]
    fn penalties_accumulate() {
        let findings = QualityFindings {
            syntax_valid: false,
            error_count: 2,
            warning_count: 3,
            ..clean()
        };
        assert_eq!(quality_score(&findings), 100 - 30 - 10 - 6);
    }

    #[test]
    fn score_never_negative() {
        let findings = QualityFindings {
            error_count: 500,
            ..Default::default()
        };
        assert_eq!(quality_score(&findings), 0);
    }

    #[test]
    fn five_warnings_give_ninety_and_pass() {
        let findings = QualityFindings {
            warning_count: 5,
            ..clean()
        };
        let report = QualityReport::evaluate(new_run_id(), findings, 70);
        assert_eq!(report.score, 90);
        assert!(report.passed);
        assert!(report.failed_checks().is_empty());
    }

    #[test]
    fn invalid_syntax_fails_even_with_high_score() {
        let findings = QualityFindings {
            syntax_valid: false,
            ..clean()
        };
        let report = QualityReport::evaluate(new_run_id(), findings, 50);
        assert_eq!(report.score, 70);
        assert!(!report.passed);
        assert_eq!(report.failed_checks(), vec!["syntax"]);
        assert!(report.failure_message(50).contains("syntax"));
    }

    #[test]
    fn below_minimum_fails() {
        let findings = QualityFindings {
            error_count: 7,
            ..clean()
        };
        let report = QualityReport::evaluate(new_run_id(), findings, 70);
        assert_eq!(report.score, 65);
        assert!(!report.passed);
        assert!(report.failure_message(70).contains("score 65 (minimum 70)"));
    }
}
