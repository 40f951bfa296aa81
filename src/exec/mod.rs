//! Execution control
//!
//! One fresh OS process per execution, a per-execution watchdog, bounded
//! output collection, and backpressure over concurrent isolated runs.

pub mod harness;
pub mod output;
pub mod precheck;
pub mod runner;
pub mod slots;

pub use runner::IsolatedRunner;
