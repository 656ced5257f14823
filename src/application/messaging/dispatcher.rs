//! Message dispatcher - Routes one inbound message to at most one plugin per phase
//!
//! Resolution order:
//! 1. Explicit phase: `!name args` runs the first plugin answering to `name`.
//! 2. Implicit phase: the first plugin whose predicate matches the raw
//!    content runs with the match result.
//!
//! Both phases run for the same message. When both find a plugin, the
//! implicit result overwrites the explicit one and is what gets delivered.

use tracing::{debug, debug_span, info, warn};

use super::diagnostic::{contain, Diagnostic, Stage};
use super::fallback::FallbackPolicy;
use super::parser::CommandParser;
use crate::domain::entities::{Request, RequestExtra};
use crate::domain::traits::Driver;
use crate::infrastructure::config::DispatchConfig;
use crate::plugins::trait_def::Argument;
use crate::plugins::PluginManager;

/// Routes messages to plugins and reports back to the originating driver
pub struct Dispatcher {
    allow_explicit: bool,
    allow_implicit: bool,
    parser: CommandParser,
    fallback: FallbackPolicy,
    plugins: PluginManager,
}

impl Dispatcher {
    pub fn new(config: &DispatchConfig, plugins: PluginManager) -> Self {
        Self {
            allow_explicit: config.allow_explicit,
            allow_implicit: config.allow_implicit,
            parser: CommandParser::default(),
            fallback: FallbackPolicy::new(config.huh_messages.clone().unwrap_or_default()),
            plugins,
        }
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn fallback(&self) -> &FallbackPolicy {
        &self.fallback
    }

    /// Resolve, run and deliver one message.
    ///
    /// Never fails: plugin errors become the response text, and a missing
    /// driver or missing driver capability just means nothing is delivered.
    pub fn dispatch<'a>(
        &'a self,
        content: impl Into<String>,
        driver: Option<&'a dyn Driver>,
        extra: RequestExtra,
    ) -> Request<'a> {
        let mut request = Request::new(content, driver, &self.fallback, extra);

        let span = debug_span!(
            "dispatch",
            request_id = %request.id(),
            driver = driver.map(|d| d.name()).unwrap_or("none")
        );
        let _enter = span.enter();
        debug!("Received: {:?}", request.content());

        if let Err(diagnostic) = self.resolve(&mut request) {
            warn!("{}", diagnostic);
            request.set_response(diagnostic.to_string());
        }

        self.finalize(&request);
        request
    }

    fn resolve(&self, request: &mut Request<'_>) -> Result<(), Diagnostic> {
        if self.allow_explicit {
            self.resolve_explicit(request)?;
        }
        if self.allow_implicit {
            self.resolve_implicit(request)?;
        }
        Ok(())
    }

    fn resolve_explicit(&self, request: &mut Request<'_>) -> Result<(), Diagnostic> {
        let Some(command) = self.parser.parse(request.content()) else {
            return Ok(());
        };

        // Accepted before the lookup: the driver shows "working" even if no
        // plugin turns out to answer to this name.
        self.accept(request);

        // Plugin getters run inside `contain` too; any of them may panic.
        let found = contain(&command.name, Stage::Lookup, || {
            Ok(self
                .plugins
                .find_by_name(&command.name)
                .map(|p| (p.clone(), p.label())))
        })?;

        match found {
            Some((plugin, label)) => {
                debug!("Explicit invocation of {}", label);
                let response = contain(&label, Stage::Run, || {
                    plugin.run(Argument::Explicit(command.argument))
                })?;
                request.set_response(response);
            }
            None => debug!("No plugin answers to {:?}", command.name),
        }
        Ok(())
    }

    fn resolve_implicit(&self, request: &mut Request<'_>) -> Result<(), Diagnostic> {
        let content = request.content().to_string();

        for (index, plugin) in self.plugins.iter().enumerate() {
            let position = format!("plugin #{}", index + 1);
            let implicit_label = contain(&position, Stage::Match, || {
                Ok(plugin.supports_implicit().then(|| plugin.label()))
            })?;
            let Some(label) = implicit_label else {
                continue;
            };

            let Some(matched) = contain(&label, Stage::Match, || plugin.matches(&content))? else {
                continue;
            };

            debug!("Implicit invocation of {}", label);
            self.accept(request);
            let response = contain(&label, Stage::Run, || plugin.run(Argument::Implicit(matched)))?;
            request.set_response(response);
            break;
        }
        Ok(())
    }

    fn accept(&self, request: &mut Request<'_>) {
        if !request.accept() {
            return;
        }
        if let Some(driver) = request.driver() {
            if driver.capabilities().working {
                if let Err(e) = driver.working(true, request) {
                    warn!("Driver {} failed to show working indicator: {}", driver.name(), e);
                }
            }
        }
    }

    fn finalize(&self, request: &Request<'_>) {
        if !request.is_accepted() {
            debug!("No plugin wanted this message");
            return;
        }

        let Some(driver) = request.driver() else {
            info!("Response (no driver to deliver to): {}", request.text());
            return;
        };

        let capabilities = driver.capabilities();
        if capabilities.say {
            if let Err(e) = driver.say(request.text(), request) {
                warn!("Driver {} failed to deliver response: {}", driver.name(), e);
            }
        }
        if capabilities.working {
            if let Err(e) = driver.working(false, request) {
                warn!("Driver {} failed to clear working indicator: {}", driver.name(), e);
            }
        }
    }
}
