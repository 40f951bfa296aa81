//! Observability
//!
//! Structured audit events for security-relevant moments in an evaluation.

pub mod audit;
