//! Plugin failure containment
//!
//! Plugin errors and panics are turned into a [`Diagnostic`] whose text is
//! sent back to the chat as the response, so a broken plugin is visible to
//! whoever triggered it and never takes the receive loop down.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use crate::application::errors::PluginResult;

/// Where in the dispatch cycle a plugin failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lookup,
    Match,
    Run,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Lookup => "looking up",
            Stage::Match => "matching",
            Stage::Run => "running",
        }
    }
}

/// A trace-like description of a plugin failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    plugin: String,
    stage: Stage,
    message: String,
    causes: Vec<String>,
    panicked: bool,
    location: Option<String>,
    backtrace: Option<String>,
}

/// Where the last panic on this thread was raised, as seen by the panic hook
#[derive(Debug, Clone, Default)]
struct PanicSite {
    location: Option<String>,
    backtrace: Option<String>,
}

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Chain a hook in front of the current one that records the panic site
/// for this thread. The previous hook still runs.
fn install_panic_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
            let backtrace = Backtrace::capture();
            let backtrace = (backtrace.status() == BacktraceStatus::Captured)
                .then(|| backtrace.to_string());
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(PanicSite { location, backtrace }));
            previous(info);
        }));
    });
}

impl Diagnostic {
    pub fn from_error(plugin: impl Into<String>, stage: Stage, error: &(dyn Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            plugin: plugin.into(),
            stage,
            message: error.to_string(),
            causes,
            panicked: false,
            location: None,
            backtrace: None,
        }
    }

    pub fn from_panic(plugin: impl Into<String>, stage: Stage, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };

        Self {
            plugin: plugin.into(),
            stage,
            message,
            causes: Vec::new(),
            panicked: true,
            location: None,
            backtrace: None,
        }
    }

    fn at(mut self, site: PanicSite) -> Self {
        self.location = site.location;
        self.backtrace = site.backtrace;
        self
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn panicked(&self) -> bool {
        self.panicked
    }

    /// `file:line:column` of the panic, when known
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.panicked { "panicked" } else { "failed" };
        writeln!(f, "Plugin '{}' {} while {}:", self.plugin, kind, self.stage.as_str())?;
        write!(f, "  error: {}", self.message)?;
        for cause in &self.causes {
            write!(f, "\n  caused by: {}", cause)?;
        }
        if let Some(location) = &self.location {
            write!(f, "\n  at: {}", location)?;
        }
        if let Some(backtrace) = &self.backtrace {
            write!(f, "\n  backtrace:\n{}", backtrace.trim_end())?;
        }
        Ok(())
    }
}

/// Run a plugin call, converting both `Err` and panics into a [`Diagnostic`]
pub fn contain<T>(
    plugin: &str,
    stage: Stage,
    call: impl FnOnce() -> PluginResult<T>,
) -> Result<T, Diagnostic> {
    install_panic_hook();
    LAST_PANIC.with(|slot| slot.borrow_mut().take());

    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Diagnostic::from_error(plugin, stage, &e)),
        Err(payload) => {
            let site = LAST_PANIC.with(|slot| slot.borrow_mut().take()).unwrap_or_default();
            Err(Diagnostic::from_panic(plugin, stage, payload).at(site))
        }
    }
}
