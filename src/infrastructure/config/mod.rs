//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub dispatch: DispatchConfig,
    pub plugins: PluginsConfig,
    pub drivers: DriversConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
}

/// Dispatch policy, read once at startup and handed to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DispatchConfig {
    /// Enables `!name args` invocations
    pub allow_explicit: bool,
    /// Enables predicate-based matching
    pub allow_implicit: bool,
    /// Fallback pool; `None` means the fixed default sentence
    pub huh_messages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PluginsConfig {
    pub geo: GeoConfig,
    pub help: HelpConfig,
    pub patterns: Vec<PatternConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GeoConfig {
    pub enabled: bool,
    /// Lookup URL; the host or IP is appended
    pub endpoint: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HelpConfig {
    pub enabled: bool,
}

/// A regex-triggered canned reply
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PatternConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub pattern: String,
    pub reply: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DriversConfig {
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConsoleConfig {
    pub enabled: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "amanda".to_string(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            allow_explicit: true,
            allow_implicit: true,
            huh_messages: None,
        }
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://freegeoip.app/json/".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Default for HelpConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Defaults plus environment overrides, for running without a config file
    pub fn load_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Override selected fields from the environment
    pub fn apply_env(&mut self) {
        if let Some(v) = env_bool("AMANDA_ALLOW_EXPLICIT") {
            self.dispatch.allow_explicit = v;
        }
        if let Some(v) = env_bool("AMANDA_ALLOW_IMPLICIT") {
            self.dispatch.allow_implicit = v;
        }
        if let Ok(name) = std::env::var("AMANDA_BOT_NAME") {
            if !name.trim().is_empty() {
                self.bot.name = name;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.name.trim().is_empty() {
            return Err(ConfigError::invalid("bot.name", "must not be empty"));
        }

        if let Some(messages) = &self.dispatch.huh_messages {
            if messages.iter().any(|m| m.trim().is_empty()) {
                return Err(ConfigError::invalid(
                    "dispatch.huh-messages",
                    "entries must not be blank",
                ));
            }
        }

        if self.plugins.geo.timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "plugins.geo.timeout-seconds",
                "must be greater than zero",
            ));
        }

        for (i, pattern) in self.plugins.patterns.iter().enumerate() {
            if let Err(e) = regex_lite::Regex::new(&pattern.pattern) {
                return Err(ConfigError::invalid(format!("plugins.patterns[{}].pattern", i), e.to_string()));
            }
        }

        Ok(())
    }

    /// Starter config written by `init-config`
    pub fn sample() -> Self {
        let mut config = Config::default();
        config.dispatch.huh_messages = Some(vec![
            "I don't understand.".to_string(),
            "Huh?".to_string(),
            "Sorry, I didn't catch that.".to_string(),
        ]);
        config.plugins.patterns.push(PatternConfig {
            name: Some("hello".to_string()),
            pattern: r"(?i)^(hi|hello|hey)\b".to_string(),
            reply: "Hello to you too!".to_string(),
            description: Some("Greets back".to_string()),
        });
        config
    }
}

fn env_bool(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!("Ignoring {}={:?}: not a boolean", key, value);
            None
        }
    }
}
