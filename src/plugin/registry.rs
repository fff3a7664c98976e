//! Plugin Registry
//!
//! In-memory catalog of capabilities, indexed by name and by category.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use log::{debug, warn};
use crate::plugin::traits::{PluginCategory, ToolPlugin};

/// Registry for capability instances
pub struct PluginRegistry {
    /// Registered plugins by name
    plugins: HashMap<String, Arc<dyn ToolPlugin>>,

    /// Plugin names grouped by category
    categories: BTreeMap<PluginCategory, Vec<String>>,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
            categories: BTreeMap::new(),
        }
    }

    /// Register a plugin, replacing any existing plugin with the same name
    pub fn register(&mut self, plugin: Arc<dyn ToolPlugin>) {
        let name = plugin.name().to_string();

        if self.plugins.contains_key(&name) {
            warn!("Plugin '{}' is already registered, overwriting", name);
            self.remove_from_categories(&name);
        }

        self.categories
            .entry(plugin.category())
            .or_default()
            .push(name.clone());
        debug!("Registered plugin '{}' ({})", name, plugin.category());
        self.plugins.insert(name, plugin);
    }

    /// Remove a plugin. Returns the removed instance; unknown names are a no-op.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn ToolPlugin>> {
        let removed = self.plugins.remove(name);
        if removed.is_some() {
            self.remove_from_categories(name);
            debug!("Unregistered plugin '{}'", name);
        }
        removed
    }

    fn remove_from_categories(&mut self, name: &str) {
        for names in self.categories.values_mut() {
            names.retain(|n| n != name);
        }
        self.categories.retain(|_, names| !names.is_empty());
    }

    /// Look up a plugin by name
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ToolPlugin>> {
        self.plugins.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Plugins whose executable patterns match `filename`, case-insensitively
    pub fn find_by_executable(&self, filename: &str) -> Vec<Arc<dyn ToolPlugin>> {
        let wanted = filename.to_lowercase();
        let mut found: Vec<Arc<dyn ToolPlugin>> = self.plugins
            .values()
            .filter(|plugin| {
                plugin.executable_patterns()
                    .iter()
                    .any(|pattern| pattern.to_lowercase() == wanted)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name().cmp(b.name()));
        found
    }

    /// Plugin names in a category, in registration order
    pub fn by_category(&self, category: PluginCategory) -> Vec<String> {
        self.categories.get(&category).cloned().unwrap_or_default()
    }

    /// Categories that currently have at least one plugin
    pub fn categories(&self) -> Vec<PluginCategory> {
        self.categories.keys().copied().collect()
    }

    /// All registered plugins sorted by name
    pub fn list(&self) -> Vec<Arc<dyn ToolPlugin>> {
        let mut plugins: Vec<_> = self.plugins.values().cloned().collect();
        plugins.sort_by(|a, b| a.name().cmp(b.name()));
        plugins
    }

    /// Registered plugin names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn count(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn clear(&mut self) {
        self.plugins.clear();
        self.categories.clear();
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .field("categories", &self.categories)
            .finish()
    }
}
