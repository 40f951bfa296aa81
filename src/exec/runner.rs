/// Process execution and monitoring with OS-enforced resource limits.
///
/// Each execution gets a fresh child process, a fresh disposable working
/// directory, a stripped environment, rlimits applied in the pre-exec hook,
/// and a private watchdog for its wall-clock budget. Nothing survives from
/// one invocation into the next.
use crate::config::policy::CapabilityPolicy;
use crate::config::types::{ExecutionOutcome, JudgeError, Result};
use crate::exec::harness;
use crate::exec::output::{spawn_collector, CollectedStream};
use crate::exec::slots::SlotPool;
use crate::observability::audit::events;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

/// Watchdog poll interval while the child is running.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Grace period between SIGTERM and SIGKILL on forced termination. The
/// payload cannot be trusted to handle SIGTERM, so this stays short.
const KILL_GRACE: Duration = Duration::from_millis(50);

/// Isolated runner executing one submission-plus-invocation pair per call.
pub struct IsolatedRunner {
    policy: Arc<CapabilityPolicy>,
    slots: SlotPool,
}

impl IsolatedRunner {
    pub fn new(policy: Arc<CapabilityPolicy>, slots: SlotPool) -> Self {
        IsolatedRunner { policy, slots }
    }

    pub fn policy(&self) -> &CapabilityPolicy {
        &self.policy
    }

    /// Execute one submission + test invocation under the policy.
    ///
    /// Submission-originated faults come back as [`ExecutionOutcome`]
    /// variants; `Err` is reserved for infrastructure failures (spawn,
    /// workspace, payload plumbing).
    pub fn run(&self, run_id: &str, submission: &str, invocation: &str) -> Result<ExecutionOutcome> {
        let _slot = self.slots.acquire()?;

        // Fresh, disposable working directory per execution; removed when
        // the TempDir handle drops on any return path.
        let workspace = tempfile::Builder::new()
            .prefix("judgebox-")
            .tempdir()
            .map_err(|e| JudgeError::Host(format!("failed to create run workspace: {e}")))?;

        let payload = harness::payload_json(&self.policy, submission, invocation)?;

        let mut cmd = Command::new(&self.policy.interpreter);
        // -I isolated mode (no user site, no env hooks), -S skip site import.
        cmd.arg("-I")
            .arg("-S")
            .arg("-c")
            .arg(harness::BOOTSTRAP)
            .current_dir(workspace.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        cmd.env_clear();
        cmd.env("PATH", "/usr/local/bin:/usr/bin:/bin");

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            let memory_ceiling = self.policy.memory_ceiling;
            let fd_limit = self.policy.fd_limit;
            let process_limit = self.policy.process_limit;
            let file_size_limit = self.policy.file_size_limit;
            unsafe {
                cmd.pre_exec(move || {
                    use nix::sys::resource::{setrlimit, Resource};

                    let rlimit_err = |e: nix::errno::Errno| {
                        std::io::Error::new(
                            std::io::ErrorKind::Other,
                            format!("setrlimit failed: {e}"),
                        )
                    };

                    if let Some(limit) = memory_ceiling {
                        setrlimit(Resource::RLIMIT_AS, limit, limit).map_err(rlimit_err)?;
                    }
                    setrlimit(Resource::RLIMIT_NOFILE, fd_limit, fd_limit).map_err(rlimit_err)?;
                    setrlimit(Resource::RLIMIT_NPROC, process_limit, process_limit)
                        .map_err(rlimit_err)?;
                    setrlimit(Resource::RLIMIT_FSIZE, file_size_limit, file_size_limit)
                        .map_err(rlimit_err)?;
                    // No core dumps from payload crashes.
                    setrlimit(Resource::RLIMIT_CORE, 0, 0).map_err(rlimit_err)?;

                    Ok(())
                });
            }
        }

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            events::host_failure(run_id, &format!("failed to spawn isolated interpreter: {e}"));
            JudgeError::Host(format!("failed to spawn isolated interpreter: {e}"))
        })?;
        let pid = child.id();

        // Payload goes over stdin, never argv. A broken pipe here means the
        // child died before reading; classification happens at wait time.
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(payload.as_bytes());
            drop(stdin);
        }

        let mut stdout_handle = child
            .stdout
            .take()
            .map(|s| spawn_collector(s, self.policy.output_limit));
        let mut stderr_handle = child
            .stderr
            .take()
            .map(|s| spawn_collector(s, self.policy.output_limit));

        // Per-execution watchdog: poll the child, enforce the wall budget.
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let stdout = join_collector(stdout_handle.take());
                    let stderr = join_collector(stderr_handle.take());
                    if stdout.truncated {
                        events::output_truncated(run_id, "stdout");
                    }
                    return Ok(classify_exit(
                        status.code(),
                        exit_signal(&status),
                        stdout,
                        stderr,
                    ));
                }
                Ok(None) => {
                    if start.elapsed() >= self.policy.timeout {
                        events::wall_time_limit(run_id, self.policy.timeout.as_millis() as u64);
                        terminate(pid);
                        events::forced_kill(run_id, pid);
                        // Reap; termination already happened, so this cannot
                        // block past the grace window.
                        let _ = child.wait();
                        let _ = join_collector(stdout_handle.take());
                        let _ = join_collector(stderr_handle.take());
                        return Ok(ExecutionOutcome::TimedOut);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    terminate(pid);
                    let _ = child.wait();
                    let _ = join_collector(stdout_handle.take());
                    let _ = join_collector(stderr_handle.take());
                    return Err(JudgeError::Host(format!("process monitoring error: {e}")));
                }
            }
        }
    }
}

fn join_collector(handle: Option<thread::JoinHandle<CollectedStream>>) -> CollectedStream {
    handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default()
}

/// SIGTERM first, short grace, then SIGKILL. Idempotent: signalling an
/// already-dead pid is a no-op error we ignore.
fn terminate(pid: u32) {
    #[cfg(unix)]
    unsafe {
        libc::kill(pid as i32, libc::SIGTERM);
    }

    thread::sleep(KILL_GRACE);

    #[cfg(unix)]
    unsafe {
        libc::kill(pid as i32, libc::SIGKILL);
    }
}

fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        status.signal()
    }
    #[cfg(not(unix))]
    {
        let _ = status;
        None
    }
}

/// Map a reaped child's exit state onto an execution outcome.
///
/// Exit 0 carries stdout verbatim (up to the capture limit); any other exit
/// is a runtime failure whose message comes from the harness's stderr line.
fn classify_exit(
    code: Option<i32>,
    signal: Option<i32>,
    stdout: CollectedStream,
    stderr: CollectedStream,
) -> ExecutionOutcome {
    match code {
        Some(0) => ExecutionOutcome::Completed {
            stdout: stdout.into_string(),
        },
        _ => ExecutionOutcome::RuntimeFailure {
            message: failure_message(code, signal, &stderr.into_string()),
        },
    }
}

/// Derive a diagnostic message for a failed execution.
fn failure_message(code: Option<i32>, signal: Option<i32>, stderr: &str) -> String {
    let detail = stderr.trim();
    if !detail.is_empty() {
        // The harness writes a single "ExceptionType: message" line.
        return detail.to_string();
    }
    if let Some(sig) = signal {
        return format!("terminated by signal {sig}");
    }
    match code {
        Some(c) => format!("process exited with status {c}"),
        None => "process terminated abnormally".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_message_prefers_stderr() {
        let msg = failure_message(Some(1), None, "ZeroDivisionError: division by zero\n");
        assert_eq!(msg, "ZeroDivisionError: division by zero");
    }

    #[test]
    fn test_failure_message_falls_back_to_signal() {
        assert_eq!(failure_message(None, Some(9), ""), "terminated by signal 9");
    }

    #[test]
    fn test_failure_message_falls_back_to_exit_code() {
        assert_eq!(
            failure_message(Some(137), None, "  "),
            "process exited with status 137"
        );
    }

    #[test]
    fn test_classify_clean_exit_keeps_stdout_verbatim() {
        let stdout = CollectedStream {
            data: b"  3.0\n".to_vec(),
            truncated: false,
        };
        let outcome = classify_exit(Some(0), None, stdout, CollectedStream::default());
        assert_eq!(
            outcome,
            ExecutionOutcome::Completed {
                stdout: "  3.0\n".to_string()
            }
        );
    }

    #[test]
    fn test_classify_nonzero_exit_is_runtime_failure() {
        let stderr = CollectedStream {
            data: b"NameError: name 'open' is not defined".to_vec(),
            truncated: false,
        };
        let outcome = classify_exit(Some(1), None, CollectedStream::default(), stderr);
        match outcome {
            ExecutionOutcome::RuntimeFailure { message } => {
                assert!(message.contains("NameError"));
            }
            other => panic!("expected runtime failure, got {other:?}"),
        }
    }
}
