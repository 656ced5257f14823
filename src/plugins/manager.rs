//! Plugin manager - ordered plugin registry consulted by the dispatcher

use std::sync::Arc;

use tracing::info;

use crate::application::errors::{PluginError, PluginResult};
use crate::plugins::trait_def::{Plugin, PluginInfo};

/// Holds every plugin in registration order.
///
/// Order matters: the first plugin that answers to an explicit name, or whose
/// predicate matches, is the one invoked.
#[derive(Default, Clone)]
pub struct PluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin at the end of the list
    pub fn register<P: Plugin + 'static>(&mut self, plugin: P) -> PluginResult<()> {
        self.register_arc(Arc::new(plugin))
    }

    pub fn register_arc(&mut self, plugin: Arc<dyn Plugin>) -> PluginResult<()> {
        // Every name the new plugin answers to must still be free
        let keys = plugin.name().into_iter().chain(plugin.aliases().iter().map(String::as_str));
        for key in keys {
            if self.find_by_name(key).is_some() {
                return Err(PluginError::Duplicate(key.to_string()));
            }
        }

        info!(
            "Registering plugin: {} (explicit: {}, implicit: {})",
            plugin.label(),
            plugin.name().is_some(),
            plugin.supports_implicit()
        );
        self.plugins.push(plugin);
        Ok(())
    }

    /// First plugin answering to `name`, ignoring case
    pub fn find_by_name(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.answers_to(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins.iter()
    }

    /// List all registered plugins
    pub fn list_plugins(&self) -> Vec<PluginInfo> {
        self.plugins.iter().map(|p| PluginInfo::of(p.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
