/// CLI entrypoint wiring for the judgebox binary.
///
/// Reads a submission file and a JSON test-case file, builds a capability
/// policy from the learner preset plus flag overrides, runs one evaluation,
/// and prints the result as JSON. Exit codes: 0 passed, 1 failed, 2 invalid
/// input or policy, 3 host failure.
use crate::config::policy::CapabilityPolicy;
use crate::config::presets;
use crate::config::types::{EvaluationStatus, JudgeError, TestCase};
use crate::judge::Judge;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "judgebox",
    about = "Evaluate a learner submission against hidden test cases in an isolated process"
)]
pub struct Cli {
    /// Path to the submission source file
    pub submission: PathBuf,

    /// Path to a JSON file holding an array of test cases
    /// ({"description", "invocation", "expected"})
    pub tests: PathBuf,

    /// Wall-clock limit per test case, in seconds
    #[arg(long, default_value_t = 5)]
    pub timeout: u64,

    /// Address-space ceiling per execution, in megabytes (0 disables)
    #[arg(long, default_value_t = 256)]
    pub memory_limit_mb: u64,

    /// Additional module admitted to the allow-list (repeatable)
    #[arg(long = "allow-module")]
    pub allow_modules: Vec<String>,

    /// Additional builtin admitted to the allow-list (repeatable)
    #[arg(long = "allow-builtin")]
    pub allow_builtins: Vec<String>,

    /// Interpreter used for isolated runs
    #[arg(long)]
    pub interpreter: Option<PathBuf>,

    /// Pretty-print the result JSON
    #[arg(long)]
    pub pretty: bool,
}

impl Cli {
    fn policy(&self) -> CapabilityPolicy {
        let mut policy = presets::learner_python();
        policy.timeout = Duration::from_secs(self.timeout);
        policy.memory_ceiling = match self.memory_limit_mb {
            0 => None,
            mb => Some(mb * 1024 * 1024),
        };
        for module in &self.allow_modules {
            policy.allowed_modules.insert(module.clone());
        }
        for builtin in &self.allow_builtins {
            policy.allowed_builtins.insert(builtin.clone());
        }
        if let Some(interpreter) = &self.interpreter {
            policy.interpreter = interpreter.clone();
        }
        policy
    }
}

/// Run one evaluation and return the process exit code.
pub fn run(cli: &Cli) -> anyhow::Result<i32> {
    let submission = std::fs::read_to_string(&cli.submission)
        .with_context(|| format!("failed to read submission {}", cli.submission.display()))?;
    let tests_json = std::fs::read_to_string(&cli.tests)
        .with_context(|| format!("failed to read test cases {}", cli.tests.display()))?;
    // A malformed test file is a caller-contract violation, not an
    // infrastructure fault; it exits with the invalid-input code.
    let test_cases: Vec<TestCase> = match serde_json::from_str(&tests_json) {
        Ok(cases) => cases,
        Err(e) => {
            let err = JudgeError::InvalidInput(format!(
                "malformed test case file {}: {e}",
                cli.tests.display()
            ));
            eprintln!("judgebox: {err}");
            return Ok(i32::from(&err));
        }
    };

    let judge = match Judge::new(cli.policy()) {
        Ok(judge) => judge,
        Err(e) => {
            eprintln!("judgebox: {e}");
            return Ok(i32::from(&e));
        }
    };

    match judge.evaluate(&submission, &test_cases) {
        Ok(result) => {
            let rendered = if cli.pretty {
                serde_json::to_string_pretty(&result)?
            } else {
                serde_json::to_string(&result)?
            };
            println!("{rendered}");
            Ok(match result.status {
                EvaluationStatus::Passed => 0,
                EvaluationStatus::Failed => 1,
            })
        }
        Err(e) => {
            eprintln!("judgebox: {e}");
            Ok(i32::from(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides_reach_policy() {
        let cli = Cli::parse_from([
            "judgebox",
            "solution.py",
            "tests.json",
            "--timeout",
            "2",
            "--memory-limit-mb",
            "64",
            "--allow-module",
            "statistics",
        ]);
        let policy = cli.policy();
        assert_eq!(policy.timeout, Duration::from_secs(2));
        assert_eq!(policy.memory_ceiling, Some(64 * 1024 * 1024));
        assert!(policy.is_module_allowed("statistics"));
    }

    #[test]
    fn test_malformed_test_file_exits_with_invalid_input_code() {
        let dir = tempfile::tempdir().unwrap();
        let submission = dir.path().join("solution.py");
        std::fs::write(&submission, "x = 1\n").unwrap();
        let tests = dir.path().join("tests.json");
        std::fs::write(&tests, "{not json").unwrap();

        let cli = Cli::parse_from([
            "judgebox",
            submission.to_str().unwrap(),
            tests.to_str().unwrap(),
        ]);
        assert_eq!(run(&cli).unwrap(), 2);
    }

    #[test]
    fn test_zero_memory_limit_disables_ceiling() {
        let cli = Cli::parse_from([
            "judgebox",
            "solution.py",
            "tests.json",
            "--memory-limit-mb",
            "0",
        ]);
        assert_eq!(cli.policy().memory_ceiling, None);
    }
}
