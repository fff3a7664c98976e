//! Built-in Plugin Implementations
//!
//! Capabilities for the tools a game launch commonly wraps.

pub mod antimicrox;
pub mod borderless;
pub mod multimonitor;
pub mod cloud_backup;

use std::sync::Arc;
use crate::plugin::traits::ToolPlugin;

// Re-export built-in plugins
pub use antimicrox::AntiMicroXPlugin;
pub use borderless::BorderlessGamingPlugin;
pub use multimonitor::MultiMonitorToolPlugin;
pub use cloud_backup::{LudusaviBackupPlugin, RcloneBackupPlugin};

/// Names of all built-in plugins, in registration order
pub fn builtin_plugin_names() -> Vec<&'static str> {
    vec!["antimicrox", "borderless", "multimonitortool", "rclone", "ludusavi"]
}

/// Create a fresh built-in plugin instance by name
pub fn create_builtin_plugin(name: &str) -> Option<Arc<dyn ToolPlugin>> {
    match name {
        "antimicrox" => Some(Arc::new(AntiMicroXPlugin::new())),
        "borderless" => Some(Arc::new(BorderlessGamingPlugin::new())),
        "multimonitortool" => Some(Arc::new(MultiMonitorToolPlugin::new())),
        "rclone" => Some(Arc::new(RcloneBackupPlugin::new())),
        "ludusavi" => Some(Arc::new(LudusaviBackupPlugin::new())),
        _ => None,
    }
}

/// Instantiate every built-in plugin
pub fn all_builtin_plugins() -> Vec<Arc<dyn ToolPlugin>> {
    builtin_plugin_names()
        .into_iter()
        .filter_map(create_builtin_plugin)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_covers_every_name() {
        for name in builtin_plugin_names() {
            let plugin = create_builtin_plugin(name).unwrap();
            assert_eq!(plugin.name(), name);
        }
        assert!(create_builtin_plugin("steam").is_none());
    }

    #[test]
    fn test_factory_returns_fresh_instances() {
        let a = create_builtin_plugin("borderless").unwrap();
        let b = create_builtin_plugin("borderless").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
