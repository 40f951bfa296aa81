/// Static capability validation before any process is spawned.
///
/// Defense in depth: the same allow-lists the harness installs inside the
/// child are applied here as a textual pass over the submission, so a
/// disallowed import or a known-dangerous builtin fails fast without
/// consuming timeout budget or an execution slot. The in-child guard remains
/// authoritative; this pass only moves the refusal earlier.
use crate::config::policy::CapabilityPolicy;
use crate::config::presets::DENIED_NAMES;

/// Protocol methods a submission may legitimately define or invoke on its
/// own objects. Everything else in dunder attribute position is treated as
/// a namespace-escape attempt (__class__, __subclasses__, __globals__, ...).
const PROTOCOL_DUNDERS: &[&str] = &[
    "__init__",
    "__repr__",
    "__str__",
    "__len__",
    "__eq__",
    "__ne__",
    "__lt__",
    "__le__",
    "__gt__",
    "__ge__",
    "__hash__",
    "__iter__",
    "__next__",
    "__contains__",
    "__getitem__",
    "__setitem__",
    "__add__",
    "__sub__",
    "__mul__",
    "__call__",
];

/// Capability violation found by the static pass.
#[derive(Clone, Debug, PartialEq)]
pub struct CapabilityViolation {
    pub message: String,
}

impl CapabilityViolation {
    fn module(name: &str) -> Self {
        CapabilityViolation {
            message: format!("capability violation: import of '{name}' is not allowed"),
        }
    }

    fn name(name: &str) -> Self {
        CapabilityViolation {
            message: format!("capability violation: use of '{name}' is not allowed"),
        }
    }
}

/// Scan a submission against the policy allow-lists.
///
/// Returns the first violation in source order, or `Ok(())` when nothing
/// disallowed is referenced. Comments and string literals are blanked out
/// before scanning, so a submission that merely mentions a denied name in
/// prose is not rejected; only code-position references count. Dunder
/// names are rejected only in attribute position and only outside the
/// protocol-method set, so ordinary class definitions pass.
pub fn check(source: &str, policy: &CapabilityPolicy) -> Result<(), CapabilityViolation> {
    let code = strip_noncode(source);

    for line in code.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("import ") {
            for module in imported_modules(rest) {
                if !policy.is_module_allowed(module) {
                    return Err(CapabilityViolation::module(module));
                }
            }
        } else if let Some(rest) = trimmed.strip_prefix("from ") {
            if let Some(module) = rest.split_whitespace().next() {
                if !policy.is_module_allowed(module) {
                    return Err(CapabilityViolation::module(module));
                }
            }
        }
    }

    for (attribute_access, ident) in identifiers(&code) {
        if DENIED_NAMES.contains(&ident) {
            return Err(CapabilityViolation::name(ident));
        }
        // Attribute-position dunders outside the protocol set are the
        // classic escape route out of a restricted namespace.
        if attribute_access
            && ident.starts_with("__")
            && ident.ends_with("__")
            && !PROTOCOL_DUNDERS.contains(&ident)
        {
            return Err(CapabilityViolation::name(ident));
        }
    }

    Ok(())
}

/// Blank out comments and string literals, preserving newlines and byte
/// positions of the surviving code so line structure and token boundaries
/// stay intact. F-string interior expressions are blanked with the rest of
/// the literal; the in-child allow-list covers anything hidden there.
fn strip_noncode(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            quote @ ('\'' | '"') => {
                let triple =
                    chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote);
                let mut j = i + if triple { 3 } else { 1 };
                while j < chars.len() {
                    if chars[j] == '\\' {
                        j += 2;
                        continue;
                    }
                    if chars[j] == quote {
                        if !triple {
                            j += 1;
                            break;
                        }
                        if chars.get(j + 1) == Some(&quote) && chars.get(j + 2) == Some(&quote) {
                            j += 3;
                            break;
                        }
                    }
                    if !triple && chars[j] == '\n' {
                        // Unterminated single-quoted literal ends at the line.
                        break;
                    }
                    j += 1;
                }
                let end = j.min(chars.len());
                for &ch in &chars[i..end] {
                    out.push(if ch == '\n' { '\n' } else { ' ' });
                }
                i = end;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Module names from an `import a, b.c as d` clause.
fn imported_modules(clause: &str) -> impl Iterator<Item = &str> {
    clause.split(',').filter_map(|part| {
        part.split_whitespace()
            .next()
            .filter(|name| !name.is_empty())
    })
}

/// Identifier-shaped tokens in source order, each flagged with whether it
/// sits in attribute position (preceded by `.`, whitespace permitted).
fn identifiers(code: &str) -> Vec<(bool, &str)> {
    let bytes = code.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len()
                && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
            {
                i += 1;
            }
            let attribute_access = code[..start].trim_end().ends_with('.');
            out.push((attribute_access, &code[start..i]));
        } else {
            i += 1;
        }
    }

    out
}
