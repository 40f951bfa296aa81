/// Core types and structures for the judgebox system
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One hidden test case supplied by the caller.
///
/// Test cases are immutable and ordered; order determines report order but
/// has no effect on scoring.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCase {
    /// Human-readable description shown back in the verdict
    pub description: String,
    /// Code fragment executed in the submission's namespace, expected to
    /// print the answer (e.g. `print(calculate_mean([1,2,3,4,5]))`)
    pub invocation: String,
    /// Expected stdout, compared after trimming surrounding whitespace
    pub expected: String,
}

/// Outcome of one isolated execution of a submission + test invocation.
///
/// Produced once per (submission, test case) pair; never reused.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Process exited cleanly; stdout captured verbatim
    Completed { stdout: String },
    /// Process raised an uncaught fault or was killed by a signal
    RuntimeFailure { message: String },
    /// Wall-clock limit expired and the process was forcibly terminated
    TimedOut,
}

/// Pass/fail outcome and diagnostic detail for one test case.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TestVerdict {
    pub description: String,
    pub expected: String,
    /// Trimmed stdout when the execution completed, absent otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    pub passed: bool,
    /// Fault or timeout message when the execution did not complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Overall status of an evaluation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    Passed,
    Failed,
}

impl std::fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationStatus::Passed => write!(f, "passed"),
            EvaluationStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal value returned to the caller; not retained by the core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub status: EvaluationStatus,
    pub passed_count: usize,
    pub total_count: usize,
    /// One verdict per test case, in input order
    pub verdicts: Vec<TestVerdict>,
}

/// Custom error types for judgebox
///
/// Submission-originated faults (capability violations, runtime faults,
/// timeouts) are never represented here; they are absorbed into failing
/// verdicts. Only caller-contract violations and infrastructure failures
/// propagate as errors.
#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("policy error: {0}")]
    Policy(String),

    #[error("host failure: {0}")]
    Host(String),
}

/// Convert judge errors to process exit codes for the CLI surface.
impl From<&JudgeError> for i32 {
    fn from(err: &JudgeError) -> i32 {
        match err {
            JudgeError::InvalidInput(_) => 2,
            JudgeError::Policy(_) => 2,
            JudgeError::Host(_) => 3,
            JudgeError::Io(_) => 74, // IO error
        }
    }
}

/// Result type alias for judgebox operations
pub type Result<T> = std::result::Result<T, JudgeError>;

impl From<nix::errno::Errno> for JudgeError {
    fn from(err: nix::errno::Errno) -> Self {
        JudgeError::Host(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(EvaluationStatus::Passed.to_string(), "passed");
        assert_eq!(EvaluationStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_outcome_serialization_shape() {
        let outcome = ExecutionOutcome::Completed {
            stdout: "3.0\n".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"kind\":\"completed\""));

        let timeout: ExecutionOutcome = serde_json::from_str("{\"kind\":\"timed_out\"}").unwrap();
        assert_eq!(timeout, ExecutionOutcome::TimedOut);
    }

    #[test]
    fn test_verdict_omits_absent_fields() {
        let verdict = TestVerdict {
            description: "mean of five".to_string(),
            expected: "3.0".to_string(),
            actual: Some("3.0".to_string()),
            passed: true,
            error: None,
        };
        let json = serde_json::to_string(&verdict).unwrap();
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(
            i32::from(&JudgeError::InvalidInput("empty".to_string())),
            2
        );
        assert_eq!(i32::from(&JudgeError::Host("spawn".to_string())), 3);
    }
}
