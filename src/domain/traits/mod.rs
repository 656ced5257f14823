//! Domain traits - Abstractions for infrastructure implementations

pub mod driver;

pub use driver::{Driver, DriverCapabilities};
