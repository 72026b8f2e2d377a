//! Activity accounting for the DevCare agent.
//!
//! Counts what flowed through the engines so the user can see the agent
//! is doing only what it claims. Nothing here is persisted.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_log, ActivityLog, ActivityStats, SharedActivityLog};
