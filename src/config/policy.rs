/// Declarative capability policy consumed uniformly by the static pre-check
/// and the isolation boundary.
///
/// The policy is an allow-list, not a deny-list: anything not explicitly
/// listed is unreachable from inside the executed program. It is pure
/// configuration; changing it never requires changing runner code.
use crate::config::types::{JudgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Capability policy for one deployment.
///
/// Fixed for the lifetime of a process (or per-deployment config); never
/// mutated mid-execution. Read-only and safely shareable across concurrent
/// invocations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapabilityPolicy {
    /// Built-in functions visible inside the sandboxed namespace
    pub allowed_builtins: BTreeSet<String>,
    /// Modules importable from inside the sandboxed namespace
    pub allowed_modules: BTreeSet<String>,
    /// Hard wall-clock limit per execution
    pub timeout: Duration,
    /// Address-space ceiling in bytes (None disables the rlimit)
    pub memory_ceiling: Option<u64>,
    /// Open file descriptor cap for the child
    pub fd_limit: u64,
    /// Process/thread cap for the child
    pub process_limit: u64,
    /// Largest file the child may create, in bytes
    pub file_size_limit: u64,
    /// Per-stream capture cap in bytes (stdout and stderr each)
    pub output_limit: usize,
    /// Interpreter executed for each isolated run
    pub interpreter: PathBuf,
}

impl CapabilityPolicy {
    /// Validate the policy before any execution uses it.
    ///
    /// An invalid policy is a deployment mistake, reported as a distinct
    /// error and never folded into a submission's verdicts.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(JudgeError::Policy(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if self.output_limit == 0 {
            return Err(JudgeError::Policy(
                "output limit must be greater than zero".to_string(),
            ));
        }
        // Child needs stdin/stdout/stderr plus harness working descriptors.
        if self.fd_limit < 8 {
            return Err(JudgeError::Policy(format!(
                "fd limit {} too low; the interpreter itself needs at least 8",
                self.fd_limit
            )));
        }
        if self.process_limit == 0 {
            return Err(JudgeError::Policy(
                "process limit must allow at least the payload process".to_string(),
            ));
        }
        if self.interpreter.as_os_str().is_empty() {
            return Err(JudgeError::Policy("interpreter path is empty".to_string()));
        }
        Ok(())
    }

    /// Whether a module (possibly dotted) is importable under this policy.
    /// Only the top-level package name is consulted, matching the import
    /// guard installed inside the child.
    pub fn is_module_allowed(&self, name: &str) -> bool {
        let top = name.split('.').next().unwrap_or(name);
        self.allowed_modules.contains(top)
    }

    /// Whether a builtin name is visible inside the sandboxed namespace.
    pub fn is_builtin_allowed(&self, name: &str) -> bool {
        self.allowed_builtins.contains(name)
    }
}
