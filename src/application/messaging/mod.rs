//! Message handling - Resolution of inbound text to a plugin response

pub mod diagnostic;
pub mod dispatcher;
pub mod fallback;
pub mod parser;

pub use diagnostic::{Diagnostic, Stage};
pub use dispatcher::Dispatcher;
pub use fallback::{FallbackPolicy, DEFAULT_FALLBACK};
pub use parser::{CommandParser, ExplicitCommand, EXPLICIT_PREFIX};
