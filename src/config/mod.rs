//! Configuration and policy
//!
//! Policy definition, validation, and the shared data model.

pub mod policy;
pub mod presets;
pub mod types;
