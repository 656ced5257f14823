//! Plugins shipped with the bot

pub mod geo;
pub mod help;
pub mod pattern;

pub use geo::GeoPlugin;
pub use help::HelpPlugin;
pub use pattern::PatternPlugin;

use crate::application::errors::PluginResult;
use crate::infrastructure::config::PluginsConfig;
use crate::plugins::PluginManager;

/// Build the registry from config.
///
/// Order: geo, then pattern responders as listed, then help.
pub fn load_from_config(config: &PluginsConfig) -> PluginResult<PluginManager> {
    let mut manager = PluginManager::new();

    if config.geo.enabled {
        manager.register(GeoPlugin::new(&config.geo)?)?;
    }

    for pattern in &config.patterns {
        manager.register(PatternPlugin::new(pattern)?)?;
    }

    if config.help.enabled {
        let entries = manager.list_plugins();
        manager.register(HelpPlugin::new(entries))?;
    }

    Ok(manager)
}
