//! Launcher context
//!
//! Owns the configuration, capability registry, installed-tool map and the
//! descriptor loader for one launcher run. The host builds it once and lends
//! it to the executor.

use std::path::{Path, PathBuf};
use log::{info, warn};
use crate::config::ConfigManager;
use crate::plugin::builtin;
use crate::plugin::loader::{LoadReport, PluginLoader};
use crate::plugin::manager::PluginManager;
use crate::plugin::registry::PluginRegistry;

#[derive(Debug)]
pub struct LauncherContext {
    pub config: ConfigManager,
    pub registry: PluginRegistry,
    pub manager: PluginManager,
    pub loader: PluginLoader,
}

impl LauncherContext {
    /// Context with every built-in capability registered
    pub fn new(config: ConfigManager) -> Self {
        let mut context = Self::empty(config);
        for plugin in builtin::all_builtin_plugins() {
            context.registry.register(plugin);
        }
        context
    }

    /// Context with an empty registry
    pub fn empty(config: ConfigManager) -> Self {
        Self {
            config,
            registry: PluginRegistry::new(),
            manager: PluginManager::new(None),
            loader: PluginLoader::new(),
        }
    }

    /// Load every descriptor in `dir`; failures are logged and returned
    pub fn load_plugins(&mut self, dir: &Path) -> LoadReport {
        let report = self.loader.load_from_directory(&mut self.registry, dir);
        log_load_report(report)
    }

    /// [`load_plugins`](Self::load_plugins) including subdirectories
    pub fn load_plugins_recursive(&mut self, dir: &Path) -> LoadReport {
        let report = self.loader.load_from_directory_recursive(&mut self.registry, dir);
        log_load_report(report)
    }

    /// Reload descriptors whose files changed since they were loaded
    pub fn reload_changed(&mut self) -> LoadReport {
        self.loader.auto_reload_changed(&mut self.registry)
    }

    /// Rescan `bin_root` for installed tools. Returns how many capabilities were found.
    pub fn scan_tools(&mut self, bin_root: Option<PathBuf>) -> usize {
        self.manager = PluginManager::new(bin_root);
        self.manager.scan_installed(&self.registry).len()
    }
}

fn log_load_report(report: LoadReport) -> LoadReport {
    for (path, error) in &report.errors {
        warn!("Failed to load plugin from {}: {}", path.display(), error);
    }
    if !report.loaded.is_empty() {
        info!("Loaded plugins: {}", report.loaded.join(", "));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_new_registers_builtins() {
        let context = LauncherContext::new(ConfigManager::from_config(Default::default()));
        assert_eq!(context.registry.count(), builtin::builtin_plugin_names().len());
        assert!(LauncherContext::empty(ConfigManager::from_config(Default::default())).registry.is_empty());
    }

    #[test]
    fn test_scan_tools_finds_installed_binaries() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("tools/rclone")).unwrap();
        fs::write(dir.path().join("tools/rclone/rclone.exe"), b"").unwrap();

        let mut context = LauncherContext::new(ConfigManager::from_config(Default::default()));
        assert_eq!(context.scan_tools(Some(dir.path().to_path_buf())), 1);
        assert!(context.manager.is_installed("rclone"));

        assert_eq!(context.scan_tools(Some(dir.path().join("missing"))), 0);
    }

    #[test]
    fn test_load_plugins_reports_errors() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.yaml"), "entry: [").unwrap();

        let mut context = LauncherContext::new(ConfigManager::from_config(Default::default()));
        let report = context.load_plugins(dir.path());
        assert!(!report.is_clean());
        assert_eq!(context.registry.count(), builtin::builtin_plugin_names().len());
    }
}
