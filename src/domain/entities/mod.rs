//! Domain entities - Core business objects

pub mod request;

pub use request::{Request, RequestExtra};
