use crate::application::errors::PluginResult;
use crate::application::messaging::EXPLICIT_PREFIX;
use crate::plugins::trait_def::{Argument, Plugin, PluginInfo};

/// Lists explicit commands. Built from a snapshot of the registry taken
/// when it is registered, so it should be registered last.
pub struct HelpPlugin {
    entries: Vec<PluginInfo>,
}

impl HelpPlugin {
    pub fn new(entries: Vec<PluginInfo>) -> Self {
        Self { entries }
    }
}

impl Plugin for HelpPlugin {
    fn name(&self) -> Option<&str> {
        Some("help")
    }

    fn description(&self) -> &str {
        "List available commands"
    }

    fn run(&self, _argument: Argument) -> PluginResult<String> {
        let mut out = String::from("Available commands:");
        out.push_str(&format!("\n{}help - {}", EXPLICIT_PREFIX, self.description()));

        for entry in &self.entries {
            let Some(name) = &entry.name else { continue };
            out.push_str(&format!("\n{}{} - {}", EXPLICIT_PREFIX, name, entry.description));
            if let Some(usage) = &entry.usage {
                out.push_str(&format!("\n  {}", usage));
            }
        }
        Ok(out)
    }
}
