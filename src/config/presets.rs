/// Versioned policy envelopes for learner runtimes.
///
/// The allow-lists define the smallest operation surface needed for typical
/// numeric/data-manipulation exercises while excluding everything that can
/// touch the filesystem, network, process table, environment, or the
/// interpreter's reflective facilities.
use crate::config::policy::CapabilityPolicy;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Builtins a learner submission may call.
pub const LEARNER_BUILTINS: &[&str] = &[
    "abs", "all", "any", "bool", "dict", "enumerate", "float", "int", "len", "list", "max", "min",
    "pow", "print", "range", "round", "set", "sorted", "str", "sum", "tuple", "zip",
];

/// Modules a learner submission may import.
pub const LEARNER_MODULES: &[&str] = &["math", "random", "itertools", "collections", "functools"];

/// Names that are never admitted into any preset and that the static
/// pre-check rejects outright when referenced by a submission. These reach
/// the filesystem, the process environment, or the interpreter's
/// introspection machinery.
pub const DENIED_NAMES: &[&str] = &[
    "eval",
    "exec",
    "compile",
    "open",
    "input",
    "breakpoint",
    "globals",
    "locals",
    "vars",
    "dir",
    "getattr",
    "setattr",
    "delattr",
    "hasattr",
    "type",
    "object",
    "super",
    "memoryview",
    "exit",
    "quit",
    "help",
];

/// Default envelope for learner-submitted Python.
pub fn learner_python() -> CapabilityPolicy {
    CapabilityPolicy {
        allowed_builtins: to_set(LEARNER_BUILTINS),
        allowed_modules: to_set(LEARNER_MODULES),
        timeout: Duration::from_secs(5),
        memory_ceiling: Some(256 * 1024 * 1024),
        fd_limit: 16,
        process_limit: 1,
        file_size_limit: 1024 * 1024,
        output_limit: 1024 * 1024,
        interpreter: PathBuf::from("/usr/bin/python3"),
    }
}

fn to_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_excludes_denied_names() {
        let policy = learner_python();
        for name in DENIED_NAMES {
            assert!(
                !policy.is_builtin_allowed(name),
                "denied name {name} leaked into the preset allow-list"
            );
        }
    }

    #[test]
    fn test_preset_excludes_host_reaching_modules() {
        let policy = learner_python();
        for module in ["os", "sys", "subprocess", "socket", "shutil", "pathlib"] {
            assert!(
                !policy.is_module_allowed(module),
                "module {module} must not be importable"
            );
        }
    }

    #[test]
    fn test_preset_builtin_surface_is_pinned() {
        // The envelope is versioned; widening it is a deliberate policy
        // change, not a side effect of editing this file.
        let policy = learner_python();
        assert_eq!(policy.allowed_builtins.len(), 22);
        for name in ["map", "repr", "reversed"] {
            assert!(
                !policy.is_builtin_allowed(name),
                "{name} is outside the learner envelope"
            );
        }
    }

    #[test]
    fn test_preset_covers_exercise_surface() {
        let policy = learner_python();
        assert!(policy.is_builtin_allowed("print"));
        assert!(policy.is_builtin_allowed("sum"));
        assert!(policy.is_module_allowed("math"));
    }
}
