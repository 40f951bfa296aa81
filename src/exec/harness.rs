/// In-child capability enforcement bootstrap.
///
/// The child interpreter starts with `-I -S` and executes [`BOOTSTRAP`],
/// which reads one JSON payload from stdin, rebuilds the capability
/// allow-list as a restricted `__builtins__` namespace, and execs the
/// submission followed by the test invocation in that namespace. Any
/// uncaught fault becomes a single `ExceptionType: message` line on stderr
/// and exit status 1, so the runner can classify it without parsing
/// tracebacks.
///
/// The payload travels on stdin, never through argv or shell interpolation,
/// so submission text cannot influence how the process is launched.
use crate::config::policy::CapabilityPolicy;
use crate::config::types::{JudgeError, Result};
use serde::Serialize;

/// Bootstrap program handed to the interpreter via `-c`.
///
/// Runs with full builtins itself; the restriction applies only to the
/// namespace the submission executes in. The import guard checks the
/// top-level package name, mirroring `CapabilityPolicy::is_module_allowed`.
pub const BOOTSTRAP: &str = r#"
import json, sys
import builtins as _host
_payload = json.load(sys.stdin)
_allowed = {}
for _name in _payload["builtins"]:
    if hasattr(_host, _name):
        _allowed[_name] = getattr(_host, _name)
_modules = set(_payload["modules"])
_host_import = _host.__import__
def _guarded_import(name, *args, **kwargs):
    if name.split(".")[0] not in _modules:
        raise ImportError("import of '%s' is not allowed" % name)
    return _host_import(name, *args, **kwargs)
_allowed["__import__"] = _guarded_import
for _mod in sorted(_modules):
    try:
        _allowed[_mod] = _host_import(_mod)
    except ImportError:
        pass
_scope = {"__builtins__": _allowed, "__name__": "__main__", "__doc__": None}
try:
    exec(compile(_payload["submission"], "<submission>", "exec"), _scope)
    exec(compile(_payload["invocation"], "<test>", "exec"), _scope)
except SystemExit:
    raise
except BaseException as _exc:
    sys.stdout.flush()
    sys.stderr.write("%s: %s" % (type(_exc).__name__, _exc))
    sys.stderr.flush()
    sys.exit(1)
sys.stdout.flush()
"#;

#[derive(Serialize)]
struct HarnessPayload<'a> {
    builtins: Vec<&'a str>,
    modules: Vec<&'a str>,
    submission: &'a str,
    invocation: &'a str,
}

/// Serialize the stdin payload for one execution.
pub fn payload_json(
    policy: &CapabilityPolicy,
    submission: &str,
    invocation: &str,
) -> Result<String> {
    let payload = HarnessPayload {
        builtins: policy.allowed_builtins.iter().map(String::as_str).collect(),
        modules: policy.allowed_modules.iter().map(String::as_str).collect(),
        submission,
        invocation,
    };
    serde_json::to_string(&payload)
        .map_err(|e| JudgeError::Host(format!("failed to encode harness payload: {e}")))
}
