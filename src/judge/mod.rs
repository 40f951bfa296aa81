//! Test case orchestration
//!
//! Drives the isolated runner once per test case, normalizes and compares
//! output, and assembles ordered verdicts. One test's failure or timeout
//! never aborts the remaining ones; each gets its own isolated execution.

use crate::config::policy::CapabilityPolicy;
use crate::config::types::{
    EvaluationResult, ExecutionOutcome, JudgeError, Result, TestCase, TestVerdict,
};
use crate::exec::precheck;
use crate::exec::runner::IsolatedRunner;
use crate::exec::slots::SlotPool;
use crate::observability::audit::events;
use crate::verdict;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Error text reported for a timed-out test case.
const TIMEOUT_ERROR: &str = "execution timeout";

/// Evaluation front door: owns the policy and the runner, exposes
/// [`Judge::evaluate`] as the sole entry point.
pub struct Judge {
    policy: Arc<CapabilityPolicy>,
    runner: IsolatedRunner,
}

impl Judge {
    /// Build a judge over a validated policy, with a host-sized slot pool.
    pub fn new(policy: CapabilityPolicy) -> Result<Self> {
        Judge::with_slots(policy, SlotPool::for_host())
    }

    /// Build a judge sharing an explicit slot pool; callers running many
    /// judges concurrently pass one pool to bound total child processes.
    pub fn with_slots(policy: CapabilityPolicy, slots: SlotPool) -> Result<Self> {
        policy.validate()?;
        let policy = Arc::new(policy);
        let runner = IsolatedRunner::new(Arc::clone(&policy), slots);
        Ok(Judge { policy, runner })
    }

    pub fn policy(&self) -> &CapabilityPolicy {
        &self.policy
    }

    /// Evaluate one submission against an ordered sequence of test cases.
    ///
    /// Submission faults (capability violations, runtime errors, timeouts)
    /// become failing verdicts. `Err` is reserved for caller-contract
    /// violations and host infrastructure failures.
    pub fn evaluate(&self, submission: &str, test_cases: &[TestCase]) -> Result<EvaluationResult> {
        validate_request(submission, test_cases)?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let fingerprint = submission_fingerprint(submission);
        events::evaluation_start(&run_id, &fingerprint, test_cases.len());

        // Static capability pass once per submission: a violation fails
        // every test case without spawning anything or consuming timeout
        // budget.
        if let Err(violation) = precheck::check(submission, &self.policy) {
            events::capability_violation(&run_id, &violation.message);
            let verdicts = test_cases
                .iter()
                .map(|tc| failed_verdict(tc, violation.message.clone()))
                .collect();
            let result = verdict::aggregate(verdicts);
            events::evaluation_end(
                &run_id,
                &result.status.to_string(),
                result.passed_count,
                result.total_count,
            );
            return Ok(result);
        }

        let mut verdicts = Vec::with_capacity(test_cases.len());
        for test_case in test_cases {
            let outcome = self.runner.run(&run_id, submission, &test_case.invocation)?;
            verdicts.push(verdict_for(test_case, outcome));
        }

        let result = verdict::aggregate(verdicts);
        events::evaluation_end(
            &run_id,
            &result.status.to_string(),
            result.passed_count,
            result.total_count,
        );
        Ok(result)
    }
}

/// Reject caller-contract violations before any runner invocation.
fn validate_request(submission: &str, test_cases: &[TestCase]) -> Result<()> {
    if submission.trim().is_empty() {
        return Err(JudgeError::InvalidInput("submission is empty".to_string()));
    }
    if test_cases.is_empty() {
        return Err(JudgeError::InvalidInput(
            "no test cases supplied".to_string(),
        ));
    }
    for (index, test_case) in test_cases.iter().enumerate() {
        if test_case.invocation.trim().is_empty() {
            return Err(JudgeError::InvalidInput(format!(
                "test case {index} has an empty invocation"
            )));
        }
    }
    Ok(())
}

/// Map one execution outcome onto one verdict.
///
/// Expected and actual are trimmed on both sides, then compared by exact
/// string equality. No numeric tolerance: `20.0` and `20` do not match.
fn verdict_for(test_case: &TestCase, outcome: ExecutionOutcome) -> TestVerdict {
    let expected = test_case.expected.trim().to_string();
    match outcome {
        ExecutionOutcome::Completed { stdout } => {
            let actual = stdout.trim().to_string();
            let passed = actual == expected;
            TestVerdict {
                description: test_case.description.clone(),
                expected,
                actual: Some(actual),
                passed,
                error: None,
            }
        }
        ExecutionOutcome::RuntimeFailure { message } => failed_verdict(test_case, message),
        ExecutionOutcome::TimedOut => failed_verdict(test_case, TIMEOUT_ERROR.to_string()),
    }
}

fn failed_verdict(test_case: &TestCase, error: String) -> TestVerdict {
    TestVerdict {
        description: test_case.description.clone(),
        expected: test_case.expected.trim().to_string(),
        actual: None,
        passed: false,
        error: Some(error),
    }
}

/// SHA-256 hex fingerprint of submission text, for audit correlation.
fn submission_fingerprint(submission: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(submission.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::presets;

    fn test_case(description: &str, invocation: &str, expected: &str) -> TestCase {
        TestCase {
            description: description.to_string(),
            invocation: invocation.to_string(),
            expected: expected.to_string(),
        }
    }

    #[test]
    fn test_empty_test_list_rejected_before_execution() {
        let judge = Judge::new(presets::learner_python()).unwrap();
        let err = judge.evaluate("def f():\n    return 1\n", &[]).unwrap_err();
        assert!(matches!(err, JudgeError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_submission_rejected() {
        let judge = Judge::new(presets::learner_python()).unwrap();
        let tests = [test_case("t", "print(1)", "1")];
        let err = judge.evaluate("   \n", &tests).unwrap_err();
        assert!(matches!(err, JudgeError::InvalidInput(_)));
    }

    #[test]
    fn test_blank_invocation_rejected() {
        let judge = Judge::new(presets::learner_python()).unwrap();
        let tests = [test_case("t", "  ", "1")];
        let err = judge.evaluate("x = 1", &tests).unwrap_err();
        assert!(matches!(err, JudgeError::InvalidInput(_)));
    }

    #[test]
    fn test_capability_violation_fails_every_test_without_spawning() {
        let judge = Judge::new(presets::learner_python()).unwrap();
        let tests = [
            test_case("first", "print(1)", "1"),
            test_case("second", "print(2)", "2"),
        ];
        let result = judge.evaluate("import os\nprint(os.getcwd())", &tests).unwrap();
        assert_eq!(result.passed_count, 0);
        assert_eq!(result.total_count, 2);
        for verdict in &result.verdicts {
            assert!(!verdict.passed);
            assert!(verdict
                .error
                .as_deref()
                .unwrap()
                .contains("capability violation"));
        }
    }

    #[test]
    fn test_verdict_mapping_completed_pass() {
        let tc = test_case("mean", "print(calculate_mean([1,2,3,4,5]))", "3.0");
        let verdict = verdict_for(
            &tc,
            ExecutionOutcome::Completed {
                stdout: "3.0\n".to_string(),
            },
        );
        assert!(verdict.passed);
        assert_eq!(verdict.actual.as_deref(), Some("3.0"));
        assert!(verdict.error.is_none());
    }

    #[test]
    fn test_verdict_mapping_completed_mismatch() {
        let tc = test_case("mean", "print(calculate_mean([1,2,3,4,5]))", "3.0");
        let verdict = verdict_for(
            &tc,
            ExecutionOutcome::Completed {
                stdout: "15\n".to_string(),
            },
        );
        assert!(!verdict.passed);
        assert_eq!(verdict.actual.as_deref(), Some("15"));
    }

    #[test]
    fn test_verdict_mapping_no_numeric_tolerance() {
        let tc = test_case("fmt", "print(f())", "20.0");
        let verdict = verdict_for(
            &tc,
            ExecutionOutcome::Completed {
                stdout: "20\n".to_string(),
            },
        );
        assert!(!verdict.passed, "20 must not match 20.0");
    }

    #[test]
    fn test_verdict_mapping_trims_both_sides() {
        let tc = test_case("ws", "print(f())", "  hello  ");
        let verdict = verdict_for(
            &tc,
            ExecutionOutcome::Completed {
                stdout: "\nhello \n".to_string(),
            },
        );
        assert!(verdict.passed);
    }

    #[test]
    fn test_verdict_mapping_runtime_failure() {
        let tc = test_case("boom", "print(f())", "1");
        let verdict = verdict_for(
            &tc,
            ExecutionOutcome::RuntimeFailure {
                message: "ZeroDivisionError: division by zero".to_string(),
            },
        );
        assert!(!verdict.passed);
        assert!(verdict.actual.is_none());
        assert_eq!(
            verdict.error.as_deref(),
            Some("ZeroDivisionError: division by zero")
        );
    }

    #[test]
    fn test_verdict_mapping_timeout() {
        let tc = test_case("spin", "f()", "1");
        let verdict = verdict_for(&tc, ExecutionOutcome::TimedOut);
        assert!(!verdict.passed);
        assert_eq!(verdict.error.as_deref(), Some("execution timeout"));
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = submission_fingerprint("def f(): pass");
        let b = submission_fingerprint("def f(): pass");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
