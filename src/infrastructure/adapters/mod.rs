//! Drivers for messaging backends

pub mod console;

pub use console::ConsoleDriver;
