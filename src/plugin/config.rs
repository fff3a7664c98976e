//! Building typed plugin configs from attribute bundles.
//!
//! Attributes follow the `{plugin}_{field}` convention. Every value is parsed
//! against the capability's schema so a malformed value surfaces as a
//! structured error instead of a silent default.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use super::error::{PluginError, PluginResult};
use super::traits::{parse_bool, PluginConfig, ToolPlugin};

/// Read-only view of the per-step attribute bundles
pub trait AttributeSource {
    fn attribute(&self, key: &str) -> Option<String>;

    /// Expand path variables; identity by default
    fn resolve_path(&self, raw: &str) -> PathBuf {
        PathBuf::from(raw)
    }

    /// Non-blank attribute value
    fn non_empty_attribute(&self, key: &str) -> Option<String> {
        self.attribute(key).filter(|value| !value.trim().is_empty())
    }
}

impl AttributeSource for HashMap<String, String> {
    fn attribute(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Resolve the tool path: plugin-specific attribute, then the generic
/// attribute name, then the installed path found by a bin scan.
pub fn resolve_tool_path(
    plugin: &dyn ToolPlugin,
    source: &dyn AttributeSource,
    installed: Option<&Path>,
) -> Option<PathBuf> {
    let specific = format!("{}_path", plugin.name());
    source.non_empty_attribute(&specific)
        .or_else(|| plugin.generic_path_attribute().and_then(|key| source.non_empty_attribute(key)))
        .map(|raw| source.resolve_path(raw.trim()))
        .or_else(|| installed.map(Path::to_path_buf))
}

/// Build the config for one invocation of `plugin`
pub fn build_plugin_config(
    plugin: &dyn ToolPlugin,
    source: &dyn AttributeSource,
    installed: Option<&Path>,
) -> PluginResult<PluginConfig> {
    let name = plugin.name();
    let mut config = PluginConfig::new(resolve_tool_path(plugin, source, installed));

    config.options = source.attribute(&format!("{}_options", name)).unwrap_or_default();
    config.arguments = source.attribute(&format!("{}_arguments", name)).unwrap_or_default();
    config.wait = read_flag(source, name, "wait", false)?;
    config.enabled = read_flag(source, name, "enabled", true)?;

    for field in plugin.config_schema() {
        let key = format!("{}_{}", name, field.name);
        let value = match source.attribute(&key) {
            Some(raw) => {
                let raw = if field.field_type.is_path() {
                    source.resolve_path(raw.trim()).to_string_lossy().into_owned()
                } else {
                    raw
                };
                Some(field.field_type.parse(&raw)
                    .map_err(|message| PluginError::invalid_field(name, &field.name, message))?)
            }
            None => field.default.clone(),
        };

        if let Some(value) = value {
            config.set_field(&field.name, value);
        }
    }

    Ok(config)
}

fn read_flag(source: &dyn AttributeSource, plugin: &str, suffix: &str, default: bool) -> PluginResult<bool> {
    match source.attribute(&format!("{}_{}", plugin, suffix)) {
        Some(raw) => parse_bool(&raw).ok_or_else(|| {
            PluginError::invalid_field(plugin, suffix, format!("expected a boolean, got '{}'", raw))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::builtin::{BorderlessGamingPlugin, RcloneBackupPlugin};
    use crate::plugin::traits::FieldValue;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_schema_defaults_fill_missing_fields() {
        let plugin = RcloneBackupPlugin::new();
        let config = build_plugin_config(&plugin, &attrs(&[("rclone_remote_name", "gdrive:")]), None).unwrap();

        assert_eq!(config.get_text("remote_name"), Some("gdrive:"));
        assert_eq!(config.get_field("backup_on_launch"), Some(&FieldValue::Bool(false)));
        assert_eq!(config.get_field("backup_on_exit"), Some(&FieldValue::Bool(true)));
        assert_eq!(config.get_text("sync_mode"), Some("sync"));
        assert!(config.enabled);
        assert!(!config.wait);
    }

    #[test]
    fn test_invalid_typed_value_is_an_error() {
        let plugin = RcloneBackupPlugin::new();
        let err = build_plugin_config(&plugin, &attrs(&[("rclone_backup_on_exit", "sometimes")]), None)
            .unwrap_err();
        assert!(matches!(err, PluginError::InvalidField { ref field, .. } if field == "backup_on_exit"));
    }

    #[test]
    fn test_tool_path_resolution_order() {
        let plugin = BorderlessGamingPlugin::new();
        let installed = PathBuf::from("/bin/root/borderless.exe");

        let specific = attrs(&[("borderless_path", "/a/borderless.exe"), ("borderless_app_path", "/b/x.exe")]);
        assert_eq!(
            resolve_tool_path(&plugin, &specific, Some(&installed)),
            Some(PathBuf::from("/a/borderless.exe"))
        );

        let generic = attrs(&[("borderless_app_path", "/b/x.exe")]);
        assert_eq!(
            resolve_tool_path(&plugin, &generic, Some(&installed)),
            Some(PathBuf::from("/b/x.exe"))
        );

        let blank = attrs(&[("borderless_path", "  ")]);
        assert_eq!(resolve_tool_path(&plugin, &blank, Some(&installed)), Some(installed.clone()));
        assert_eq!(resolve_tool_path(&plugin, &blank, None), None);
    }

    #[test]
    fn test_wait_and_enabled_flags() {
        let plugin = BorderlessGamingPlugin::new();
        let config = build_plugin_config(
            &plugin,
            &attrs(&[("borderless_wait", "1"), ("borderless_enabled", "false")]),
            None,
        ).unwrap();
        assert!(config.wait);
        assert!(!config.enabled);

        let err = build_plugin_config(&plugin, &attrs(&[("borderless_wait", "later")]), None).unwrap_err();
        assert!(err.is_configuration_error());
    }
}
