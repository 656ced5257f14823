use crate::application::errors::BotError;
use crate::domain::entities::Request;

/// Optional driver capabilities, checked before each call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverCapabilities {
    /// Driver can show a typing/working indicator
    pub working: bool,
    /// Driver can deliver a response to the originating conversation
    pub say: bool,
}

impl DriverCapabilities {
    pub const NONE: Self = Self {
        working: false,
        say: false,
    };

    pub const ALL: Self = Self {
        working: true,
        say: true,
    };
}

/// Driver trait - abstraction for messaging backends
///
/// Both operations are optional. The dispatcher only calls an operation when
/// the matching flag in [`Driver::capabilities`] is set.
pub trait Driver {
    /// Short backend name for logs
    fn name(&self) -> &str;

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities::NONE
    }

    /// Toggle the typing/working indicator
    fn working(&self, _active: bool, _request: &Request<'_>) -> Result<(), BotError> {
        Ok(())
    }

    /// Deliver the final response
    fn say(&self, _text: &str, _request: &Request<'_>) -> Result<(), BotError> {
        Ok(())
    }
}
