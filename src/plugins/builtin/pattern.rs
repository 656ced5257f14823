//! Regex-triggered canned replies declared in config

use regex_lite::Regex;

use crate::application::errors::PluginResult;
use crate::infrastructure::config::PatternConfig;
use crate::plugins::trait_def::{Argument, MatchResult, Plugin};

/// Replies with a template whenever its regex matches.
///
/// The reply may reference capture groups as `$1` or `${name}`.
pub struct PatternPlugin {
    name: Option<String>,
    description: String,
    regex: Regex,
    reply: String,
}

impl PatternPlugin {
    pub fn new(config: &PatternConfig) -> PluginResult<Self> {
        Ok(Self {
            name: config.name.clone(),
            description: config
                .description
                .clone()
                .unwrap_or_else(|| format!("Replies to /{}/", config.pattern)),
            regex: Regex::new(&config.pattern)?,
            reply: config.reply.clone(),
        })
    }

    fn expand(&self, input: &str) -> Option<String> {
        let caps = self.regex.captures(input)?;
        let mut out = String::new();
        caps.expand(&self.reply, &mut out);
        Some(out)
    }
}

impl Plugin for PatternPlugin {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn supports_implicit(&self) -> bool {
        true
    }

    fn matches(&self, content: &str) -> PluginResult<Option<MatchResult>> {
        Ok(self
            .regex
            .captures(content)
            .map(|caps| MatchResult::from_captures(content, &self.regex, &caps)))
    }

    fn run(&self, argument: Argument) -> PluginResult<String> {
        let input = match &argument {
            Argument::Explicit(text) => text.as_str(),
            Argument::Implicit(m) => m.input(),
        };

        Ok(self
            .expand(input)
            .unwrap_or_else(|| format!("{:?} does not match /{}/", input, self.regex.as_str())))
    }
}
