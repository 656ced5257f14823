//! Application layer - Dispatch logic
//!
//! This layer contains:
//! - Errors: Domain-specific errors
//! - Messaging: Command parsing, fallback replies, dispatching

pub mod errors;
pub mod messaging;
