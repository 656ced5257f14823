//! Domain layer - Core objects and the interfaces around them
//!
//! This layer contains:
//! - Entities: the per-message Request
//! - Traits: the Driver abstraction over messaging backends

pub mod entities;
pub mod traits;
