//! Core Plugin Traits
//!
//! Defines the capability interface every tool integration implements, the
//! configuration schema types it publishes, and the per-invocation config it
//! builds commands from.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use super::command::CommandLine;
use super::error::{PluginError, PluginResult};

/// Category used to group capabilities in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PluginCategory {
    Mappers,
    Windowing,
    Display,
    Audio,
    Discs,
    Sync,
    Utilities,
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PluginCategory::Mappers => "MAPPERS",
            PluginCategory::Windowing => "WINDOWING",
            PluginCategory::Display => "DISPLAY",
            PluginCategory::Audio => "AUDIO",
            PluginCategory::Discs => "DISCS",
            PluginCategory::Sync => "SYNC",
            PluginCategory::Utilities => "UTILITIES",
        };
        f.write_str(name)
    }
}

/// Declared type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    File,
    Directory,
    Boolean,
    String,
    Integer,
}

impl FieldType {
    /// Parse a raw configuration string as this type
    pub fn parse(&self, raw: &str) -> Result<FieldValue, String> {
        let trimmed = raw.trim();
        match self {
            FieldType::Boolean => parse_bool(trimmed)
                .map(FieldValue::Bool)
                .ok_or_else(|| format!("expected a boolean, got '{}'", raw)),
            FieldType::Integer => trimmed.parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| format!("expected an integer, got '{}'", raw)),
            FieldType::String => Ok(FieldValue::Text(raw.to_string())),
            FieldType::File | FieldType::Directory => Ok(FieldValue::Path(PathBuf::from(trimmed))),
        }
    }

    pub fn is_path(&self) -> bool {
        matches!(self, FieldType::File | FieldType::Directory)
    }
}

/// Accepts the spellings used by ini-style and TOML configuration
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// A typed configuration value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Bool(bool),
    Integer(i64),
    Text(String),
    Path(PathBuf),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Path(path) => path.as_os_str().is_empty(),
            _ => false,
        }
    }
}

/// Defines a configuration field for a capability
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigField {
    pub name: String,
    pub field_type: FieldType,
    pub label: String,
    pub required: bool,
    pub default: Option<FieldValue>,
    /// File dialog filter hint (e.g. "*.amgp")
    pub filter: Option<String>,
    pub help_text: Option<String>,
}

impl ConfigField {
    pub fn new(name: &str, field_type: FieldType, label: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            label: label.to_string(),
            required: false,
            default: None,
            filter: None,
            help_text: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: FieldValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_filter(mut self, filter: &str) -> Self {
        self.filter = Some(filter.to_string());
        self
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help_text = Some(help.to_string());
        self
    }
}

/// Runtime configuration for one capability invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginConfig {
    pub tool_path: Option<PathBuf>,
    pub options: String,
    pub arguments: String,
    pub wait: bool,
    pub enabled: bool,
    fields: HashMap<String, FieldValue>,
}

impl PluginConfig {
    pub fn new(tool_path: Option<PathBuf>) -> Self {
        Self {
            tool_path,
            enabled: true,
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: &str) -> Self {
        self.options = options.to_string();
        self
    }

    pub fn with_arguments(mut self, arguments: &str) -> Self {
        self.arguments = arguments.to_string();
        self
    }

    pub fn with_field(mut self, name: &str, value: FieldValue) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn set_field(&mut self, name: &str, value: FieldValue) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Boolean field, `default` when unset or of another type
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.fields.get(name) {
            Some(FieldValue::Bool(value)) => *value,
            _ => default,
        }
    }

    /// Non-empty text field
    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Text(text)) if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        }
    }

    /// Non-empty path field (text values are accepted as paths)
    pub fn get_path(&self, name: &str) -> Option<&Path> {
        match self.fields.get(name) {
            Some(FieldValue::Path(path)) if !path.as_os_str().is_empty() => Some(path.as_path()),
            Some(FieldValue::Text(text)) if !text.trim().is_empty() => Some(Path::new(text.as_str())),
            _ => None,
        }
    }

    /// Path field that also exists on disk
    pub fn existing_path(&self, name: &str) -> Option<&Path> {
        self.get_path(name).filter(|path| path.exists())
    }

    /// Tool executable, only if it exists on disk
    pub fn tool(&self) -> Option<&Path> {
        self.tool_path.as_deref().filter(|path| path.exists())
    }
}

/// Interface describing one external tool integration.
///
/// Command builders are pure functions of the config. When a required
/// input is missing (no tool path, no profile file) they return `None` and
/// the step is silently skipped.
pub trait ToolPlugin: Send + Sync {
    /// Unique identifier (lowercase, no spaces), e.g. `antimicrox`
    fn name(&self) -> &str;

    /// Human-readable name, e.g. `AntiMicroX`
    fn display_name(&self) -> &str;

    fn category(&self) -> PluginCategory;

    fn description(&self) -> &str {
        ""
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    /// Executable file names to search for, matched case-insensitively
    fn executable_patterns(&self) -> Vec<String>;

    /// Relative directories worth searching inside the bin root
    fn search_paths(&self) -> Vec<String> {
        Vec::new()
    }

    fn config_schema(&self) -> Vec<ConfigField> {
        Vec::new()
    }

    /// Check required schema fields are present and non-empty
    fn validate_config(&self, config: &PluginConfig) -> PluginResult<()> {
        for field in self.config_schema() {
            if !field.required {
                continue;
            }
            let present = config.get_field(&field.name)
                .map(|value| !value.is_empty())
                .unwrap_or(false);
            if !present {
                return Err(PluginError::missing_required_field(self.name(), field.label));
            }
        }
        Ok(())
    }

    fn build_launch_command(&self, config: &PluginConfig) -> Option<CommandLine>;

    fn build_exit_command(&self, _config: &PluginConfig) -> Option<CommandLine> {
        None
    }

    /// Whether the capability has a distinct exit command
    fn supports_exit_action(&self) -> bool {
        false
    }

    /// Whether a non-waited process should be kept for cleanup
    fn should_track_process(&self) -> bool {
        true
    }

    fn should_terminate_on_exit(&self) -> bool {
        false
    }

    /// Process name for kill-by-name fallbacks, defaults to the tool file name
    fn process_name(&self, config: &PluginConfig) -> Option<String> {
        config.tool_path.as_ref()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
    }

    /// Attribute holding the tool path under its pre-plugin name
    fn generic_path_attribute(&self) -> Option<&str> {
        None
    }

    fn documentation_url(&self) -> Option<&str> {
        None
    }
}

impl fmt::Debug for dyn ToolPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolPlugin")
            .field("name", &self.name())
            .field("category", &self.category())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_parsing() {
        assert_eq!(FieldType::Boolean.parse("Yes").unwrap(), FieldValue::Bool(true));
        assert_eq!(FieldType::Boolean.parse("0").unwrap(), FieldValue::Bool(false));
        assert!(FieldType::Boolean.parse("maybe").is_err());
        assert_eq!(FieldType::Integer.parse(" 42 ").unwrap(), FieldValue::Integer(42));
        assert!(FieldType::Integer.parse("forty").is_err());
        assert_eq!(
            FieldType::File.parse("/tmp/p1.amgp").unwrap(),
            FieldValue::Path(PathBuf::from("/tmp/p1.amgp"))
        );
    }

    #[test]
    fn test_plugin_config_accessors() {
        let config = PluginConfig::new(None)
            .with_field("flag", FieldValue::Bool(true))
            .with_field("remote", FieldValue::Text("gdrive:".to_string()))
            .with_field("blank", FieldValue::Text("  ".to_string()))
            .with_field("profile", FieldValue::Path(PathBuf::from("/no/such/file")));

        assert!(config.enabled);
        assert!(config.get_bool("flag", false));
        assert!(!config.get_bool("missing", false));
        assert_eq!(config.get_text("remote"), Some("gdrive:"));
        assert_eq!(config.get_text("blank"), None);
        assert_eq!(config.get_path("profile"), Some(Path::new("/no/such/file")));
        assert_eq!(config.existing_path("profile"), None);
        assert_eq!(config.tool(), None);
    }

    #[test]
    fn test_category_serialization() {
        let category: PluginCategory = serde_yaml::from_str("MAPPERS").unwrap();
        assert_eq!(category, PluginCategory::Mappers);
        assert_eq!(PluginCategory::Sync.to_string(), "SYNC");
    }
}
