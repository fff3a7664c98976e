//! Plugin descriptor files
//!
//! A descriptor is a YAML document naming exactly one constructor entry
//! point. The entry is looked up in a fixed factory table: every built-in
//! capability name, plus `template` for capabilities defined entirely by the
//! descriptor's command templates.
//!
//! ```yaml
//! entry: template
//! api_version: 20261019
//! name: sunshine
//! display_name: Sunshine
//! version: 0.23.1
//! category: UTILITIES
//! executable_patterns: [sunshine.exe, sunshine]
//! launch: "{tool} {options} --profile {field:profile} {arguments}"
//! exit: "{tool} --stop"
//! fields:
//!   - name: profile
//!     type: file
//!     label: Streaming Profile
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;
use serde::Deserialize;
use crate::plugin::builtin;
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::template::TemplatePlugin;
use crate::plugin::traits::{ConfigField, FieldType, PluginCategory, ToolPlugin};

include!(concat!(env!("OUT_DIR"), "/descriptor_api.rs"));

/// Entry point name for data-driven capabilities
pub const TEMPLATE_ENTRY: &str = "template";

/// Parsed descriptor file
#[derive(Debug, Clone, Deserialize)]
pub struct PluginDescriptor {
    /// Constructor entry point
    pub entry: String,
    pub api_version: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub documentation_url: Option<String>,
    #[serde(default)]
    pub category: Option<PluginCategory>,
    #[serde(default)]
    pub executable_patterns: Vec<String>,
    #[serde(default)]
    pub search_paths: Vec<String>,
    /// Generic attribute name holding the tool path
    #[serde(default)]
    pub path_attribute: Option<String>,
    /// Launch command template
    #[serde(default)]
    pub launch: Option<String>,
    /// Exit command template
    #[serde(default)]
    pub exit: Option<String>,
    #[serde(default = "default_true")]
    pub track_process: bool,
    #[serde(default)]
    pub terminate_on_exit: bool,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

fn default_true() -> bool {
    true
}

/// Schema field as written in a descriptor
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub help: Option<String>,
}

impl FieldDescriptor {
    pub fn to_config_field(&self) -> PluginResult<ConfigField> {
        let label = self.label.clone().unwrap_or_else(|| self.name.clone());
        let mut field = ConfigField::new(&self.name, self.field_type, &label);
        if self.required {
            field = field.required();
        }
        if let Some(raw) = &self.default {
            let value = self.field_type.parse(raw).map_err(|e| {
                PluginError::descriptor_parse_error(format!("Default for field '{}': {}", self.name, e))
            })?;
            field = field.with_default(value);
        }
        if let Some(filter) = &self.filter {
            field = field.with_filter(filter);
        }
        if let Some(help) = &self.help {
            field = field.with_help(help);
        }
        Ok(field)
    }
}

impl PluginDescriptor {
    /// Parse descriptor YAML
    pub fn parse_yaml(content: &str) -> PluginResult<Self> {
        let descriptor: PluginDescriptor = serde_yaml::from_str(content)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Read and parse a descriptor file
    pub fn from_file(path: &Path) -> PluginResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PluginError::loading_failed(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse_yaml(&content)
    }

    fn validate(&self) -> PluginResult<()> {
        if self.entry.trim().is_empty() {
            return Err(PluginError::descriptor_parse_error("Entry point cannot be empty"));
        }

        if self.api_version == 0 {
            return Err(PluginError::descriptor_parse_error("API version cannot be zero"));
        }

        // Same major version (year) is compatible
        if self.api_version / 10000 != DESCRIPTOR_API_VERSION / 10000 {
            return Err(PluginError::descriptor_parse_error(format!(
                "Incompatible descriptor API version {} (expected major version {})",
                self.api_version,
                DESCRIPTOR_API_VERSION / 10000
            )));
        }

        Ok(())
    }

    /// Construct a fresh capability through the factory table
    pub fn instantiate(&self, path: &Path) -> PluginResult<Arc<dyn ToolPlugin>> {
        match self.entry.as_str() {
            TEMPLATE_ENTRY => {
                let plugin = TemplatePlugin::from_descriptor(self)?;
                Ok(Arc::new(plugin))
            }
            entry => builtin::create_builtin_plugin(entry)
                .ok_or_else(|| PluginError::unknown_entry_point(entry, path.to_path_buf())),
        }
    }
}
