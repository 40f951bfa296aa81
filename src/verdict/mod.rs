//! Verdict reduction
//!
//! Pure, deterministic reduction of per-test verdicts into an evaluation
//! result. No side effects; running the same verdict sequence through this
//! module always yields the same aggregate.

use crate::config::types::{EvaluationResult, EvaluationStatus, TestVerdict};

/// Reduce an ordered verdict sequence into the terminal result.
///
/// `status` is `Passed` iff every verdict passed and there is at least one
/// verdict; an empty sequence can never be `Passed`.
pub fn aggregate(verdicts: Vec<TestVerdict>) -> EvaluationResult {
    let total_count = verdicts.len();
    let passed_count = verdicts.iter().filter(|v| v.passed).count();
    let status = if passed_count == total_count && total_count > 0 {
        EvaluationStatus::Passed
    } else {
        EvaluationStatus::Failed
    };

    EvaluationResult {
        status,
        passed_count,
        total_count,
        verdicts,
    }
}
