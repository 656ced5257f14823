//! amanda-bot: routes chat messages to plugins and replies through the
//! driver they came from.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;

pub use application::errors::{BotError, ConfigError, PluginError};
pub use application::messaging::Dispatcher;
pub use domain::entities::{Request, RequestExtra};
pub use domain::traits::{Driver, DriverCapabilities};
pub use plugins::{Argument, MatchResult, Plugin, PluginManager};
