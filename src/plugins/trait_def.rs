//! Plugin trait definitions

use std::collections::HashMap;

use regex_lite::{Captures, Regex};
use serde::Serialize;

use crate::application::errors::PluginResult;

/// Core plugin trait that all plugins must implement.
///
/// A plugin is reachable explicitly (`!name args`) when [`Plugin::name`]
/// returns a name, and implicitly when [`Plugin::supports_implicit`] is true.
/// It may support both, or neither (in which case it is never invoked).
pub trait Plugin: Send + Sync {
    /// Name used for explicit invocation, matched case-insensitively
    fn name(&self) -> Option<&str> {
        None
    }

    /// Additional explicit invocation names
    fn aliases(&self) -> &[String] {
        &[]
    }

    /// Human-readable description
    fn description(&self) -> &str {
        ""
    }

    /// Optional usage line shown by `!help`
    fn usage(&self) -> Option<&str> {
        None
    }

    /// Whether [`Plugin::matches`] should be consulted for implicit invocation
    fn supports_implicit(&self) -> bool {
        false
    }

    /// Match the raw message content. `Ok(None)` means no match.
    fn matches(&self, _content: &str) -> PluginResult<Option<MatchResult>> {
        Ok(None)
    }

    /// Produce the response text
    fn run(&self, argument: Argument) -> PluginResult<String>;

    /// True if `input` equals the name or one of the aliases, ignoring case
    fn answers_to(&self, input: &str) -> bool {
        let input = input.to_lowercase();
        self.name().is_some_and(|n| n.to_lowercase() == input)
            || self.aliases().iter().any(|a| a.to_lowercase() == input)
    }

    /// Label used in logs and diagnostics
    fn label(&self) -> String {
        self.name()
            .map(str::to_string)
            .unwrap_or_else(|| "<anonymous>".to_string())
    }
}

/// What a plugin is run with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// Text following `!name`, possibly empty
    Explicit(String),
    /// Result of the plugin's own match predicate
    Implicit(MatchResult),
}

impl Argument {
    pub fn is_explicit(&self) -> bool {
        matches!(self, Argument::Explicit(_))
    }

    /// The explicit argument string, or the matched text for implicit runs
    pub fn text(&self) -> &str {
        match self {
            Argument::Explicit(s) => s,
            Argument::Implicit(m) => m.matched(),
        }
    }
}

/// Outcome of a successful implicit match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    input: String,
    matched: String,
    groups: Vec<Option<String>>,
    named: HashMap<String, String>,
}

impl MatchResult {
    /// A match with no capture groups
    pub fn new(input: impl Into<String>, matched: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            matched: matched.into(),
            groups: Vec::new(),
            named: HashMap::new(),
        }
    }

    pub fn from_captures(input: &str, regex: &Regex, caps: &Captures<'_>) -> Self {
        let matched = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let groups = caps
            .iter()
            .skip(1)
            .map(|g| g.map(|m| m.as_str().to_string()))
            .collect();
        let named = regex
            .capture_names()
            .flatten()
            .filter_map(|n| caps.name(n).map(|m| (n.to_string(), m.as_str().to_string())))
            .collect();

        Self {
            input: input.to_string(),
            matched: matched.to_string(),
            groups,
            named,
        }
    }

    /// The full content the predicate was evaluated against
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn matched(&self) -> &str {
        &self.matched
    }

    /// Capture group by 1-based index
    pub fn group(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.groups.get(i))
            .and_then(|g| g.as_deref())
    }

    pub fn named(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }
}

/// Plugin information for listing
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    pub name: Option<String>,
    pub aliases: Vec<String>,
    pub description: String,
    pub usage: Option<String>,
    pub implicit: bool,
}

impl PluginInfo {
    pub fn of(plugin: &dyn Plugin) -> Self {
        Self {
            name: plugin.name().map(str::to_string),
            aliases: plugin.aliases().to_vec(),
            description: plugin.description().to_string(),
            usage: plugin.usage().map(str::to_string),
            implicit: plugin.supports_implicit(),
        }
    }
}
