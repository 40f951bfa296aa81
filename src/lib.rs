//! judgebox: a single-submission untrusted code evaluation core
//! Runs learner-submitted Python against hidden test cases inside isolated,
//! resource-limited child processes and reports per-test verdicts.
//!
//! # Architecture
//!
//! This crate is organized by responsibility:
//!
//! ## Configuration & Policy ([`config`])
//! - [`config::types`]: Shared type definitions and the error taxonomy
//! - [`config::policy`]: Declarative capability policy (allow-lists + limits)
//! - [`config::presets`]: Versioned learner-runtime policy envelopes
//!
//! ## Execution Control ([`exec`])
//! - [`exec::runner`]: One fresh OS process per execution, watchdog timeout
//! - [`exec::harness`]: In-child capability enforcement bootstrap
//! - [`exec::precheck`]: Static capability validation before any spawn
//! - [`exec::output`]: Bounded output collection
//! - [`exec::slots`]: Backpressure over concurrent isolated executions
//!
//! ## Orchestration & Verdict ([`judge`], [`verdict`])
//! - [`judge`]: Per-test-case sequencing, normalization, verdict mapping
//! - [`verdict`]: Pure reduction of verdicts into an evaluation result
//!
//! ## Observability ([`observability`])
//! - [`observability::audit`]: Structured audit events
//!
//! # Design Principles
//!
//! 1. **Process boundary as truth** - Isolation is enforced by the OS
//!    (fresh process, rlimits, stripped environment), never by cooperative
//!    checks inside the host service.
//! 2. **Defense in depth** - The capability allow-list is applied three
//!    times: statically before spawn, inside the child interpreter, and
//!    implicitly by OS resource limits.
//! 3. **Submission faults are verdicts** - Nothing a submission does may
//!    surface as a host error; only caller-contract violations and
//!    infrastructure failures propagate as `Err`.
//! 4. **No shared timer state** - Every execution carries its own watchdog
//!    tied to its own child process.

// Configuration & Policy
pub mod config;

// Execution Control
pub mod exec;

// Orchestration
pub mod judge;

// Verdict reduction
pub mod verdict;

// Observability
pub mod observability;

// CLI entrypoint wiring shared by the judgebox binary.
pub mod cli;

// Re-export commonly used types for convenience
pub use config::policy::CapabilityPolicy;
pub use config::types::*;
pub use judge::Judge;
