//! Data-driven capability built from descriptor command templates.
//!
//! Templates are split into words like a command line. A word that is
//! exactly `{options}` or `{arguments}` expands to the split attribute text;
//! `{tool}` and `{field:NAME}` are substituted inside a word. A template that
//! references an unset field or a missing tool builds no command.

use std::sync::OnceLock;
use regex::{Captures, Regex};
use crate::plugin::command::{split_args, CommandLine};
use crate::plugin::descriptor::PluginDescriptor;
use crate::plugin::error::{PluginError, PluginResult};
use crate::plugin::traits::{ConfigField, FieldValue, PluginCategory, PluginConfig, ToolPlugin};

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{(tool|options|arguments|field:([A-Za-z0-9_]+))\}")
            .expect("placeholder pattern is valid")
    })
}

#[derive(Debug, Clone)]
pub struct TemplatePlugin {
    name: String,
    display_name: String,
    description: String,
    version: String,
    documentation_url: Option<String>,
    category: PluginCategory,
    patterns: Vec<String>,
    search_paths: Vec<String>,
    path_attribute: Option<String>,
    launch: Option<String>,
    exit: Option<String>,
    track_process: bool,
    terminate_on_exit: bool,
    schema: Vec<ConfigField>,
}

impl TemplatePlugin {
    pub fn from_descriptor(descriptor: &PluginDescriptor) -> PluginResult<Self> {
        let name = descriptor.name.clone()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| PluginError::descriptor_parse_error("Template plugins require a name"))?;

        if descriptor.launch.is_none() && descriptor.exit.is_none() {
            return Err(PluginError::descriptor_parse_error(format!(
                "Template plugin '{}' defines neither a launch nor an exit command", name
            )));
        }

        let schema = descriptor.fields
            .iter()
            .map(|field| field.to_config_field())
            .collect::<PluginResult<Vec<_>>>()?;

        for template in descriptor.launch.iter().chain(descriptor.exit.iter()) {
            for caps in placeholder_pattern().captures_iter(template) {
                if let Some(field) = caps.get(2) {
                    if !schema.iter().any(|f| f.name == field.as_str()) {
                        return Err(PluginError::descriptor_parse_error(format!(
                            "Template plugin '{}' references undeclared field '{}'", name, field.as_str()
                        )));
                    }
                }
            }
        }

        Ok(Self {
            display_name: descriptor.display_name.clone().unwrap_or_else(|| name.clone()),
            description: descriptor.description.clone().unwrap_or_default(),
            version: descriptor.version.clone().unwrap_or_else(|| "1.0.0".to_string()),
            documentation_url: descriptor.documentation_url.clone(),
            category: descriptor.category.unwrap_or(PluginCategory::Utilities),
            patterns: descriptor.executable_patterns.clone(),
            search_paths: descriptor.search_paths.clone(),
            path_attribute: descriptor.path_attribute.clone(),
            launch: descriptor.launch.clone(),
            exit: descriptor.exit.clone(),
            track_process: descriptor.track_process,
            terminate_on_exit: descriptor.terminate_on_exit,
            schema,
            name,
        })
    }

    fn render(&self, template: &str, config: &PluginConfig) -> Option<CommandLine> {
        let tool = config.tool().map(|p| p.to_string_lossy().into_owned());
        let mut words = Vec::new();

        for word in split_args(template) {
            match word.as_str() {
                "{options}" => words.extend(split_args(&config.options)),
                "{arguments}" => words.extend(split_args(&config.arguments)),
                _ => words.push(substitute(&word, tool.as_deref(), config)?),
            }
        }

        let mut words = words.into_iter();
        let program = words.next()?;
        Some(CommandLine::new(program).args(words))
    }
}

/// Replace placeholders inside one word; `None` if any value is missing
fn substitute(word: &str, tool: Option<&str>, config: &PluginConfig) -> Option<String> {
    let mut missing = false;
    let rendered = placeholder_pattern().replace_all(word, |caps: &Captures| {
        let value = match (&caps[1], caps.get(2)) {
            ("tool", _) => tool.map(str::to_string),
            ("options", _) => Some(config.options.clone()),
            ("arguments", _) => Some(config.arguments.clone()),
            (_, Some(field)) => field_text(config, field.as_str()),
            _ => None,
        };
        value.unwrap_or_else(|| {
            missing = true;
            String::new()
        })
    });

    if missing {
        None
    } else {
        Some(rendered.into_owned())
    }
}

fn field_text(config: &PluginConfig, name: &str) -> Option<String> {
    match config.get_field(name)? {
        FieldValue::Bool(value) => Some(value.to_string()),
        FieldValue::Integer(value) => Some(value.to_string()),
        FieldValue::Text(text) if !text.trim().is_empty() => Some(text.clone()),
        FieldValue::Path(path) if !path.as_os_str().is_empty() => Some(path.to_string_lossy().into_owned()),
        _ => None,
    }
}

impl ToolPlugin for TemplatePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn category(&self) -> PluginCategory {
        self.category
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn documentation_url(&self) -> Option<&str> {
        self.documentation_url.as_deref()
    }

    fn executable_patterns(&self) -> Vec<String> {
        self.patterns.clone()
    }

    fn search_paths(&self) -> Vec<String> {
        self.search_paths.clone()
    }

    fn config_schema(&self) -> Vec<ConfigField> {
        self.schema.clone()
    }

    fn build_launch_command(&self, config: &PluginConfig) -> Option<CommandLine> {
        self.render(self.launch.as_deref()?, config)
    }

    fn build_exit_command(&self, config: &PluginConfig) -> Option<CommandLine> {
        self.render(self.exit.as_deref()?, config)
    }

    fn supports_exit_action(&self) -> bool {
        self.exit.is_some()
    }

    fn should_track_process(&self) -> bool {
        self.track_process
    }

    fn should_terminate_on_exit(&self) -> bool {
        self.terminate_on_exit
    }

    fn generic_path_attribute(&self) -> Option<&str> {
        self.path_attribute.as_deref()
    }
}
