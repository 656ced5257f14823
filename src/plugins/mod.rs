//! Plugin system
//!
//! Plugins are consulted in registration order, first explicitly by name and
//! then implicitly through their own match predicate.

pub mod builtin;
pub mod manager;
pub mod trait_def;

pub use manager::PluginManager;
pub use trait_def::{Argument, MatchResult, Plugin, PluginInfo};
