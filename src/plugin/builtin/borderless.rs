//! Borderless Gaming Plugin

use crate::plugin::command::CommandLine;
use crate::plugin::traits::{ConfigField, FieldType, FieldValue, PluginCategory, PluginConfig, ToolPlugin};

/// Forces windowed games into borderless fullscreen
#[derive(Debug, Default)]
pub struct BorderlessGamingPlugin;

impl BorderlessGamingPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl ToolPlugin for BorderlessGamingPlugin {
    fn name(&self) -> &str {
        "borderless"
    }

    fn display_name(&self) -> &str {
        "Borderless Gaming"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Windowing
    }

    fn description(&self) -> &str {
        "Forces windowed games into borderless fullscreen"
    }

    fn executable_patterns(&self) -> Vec<String> {
        vec![
            "borderless.exe".into(),
            "borderless".into(),
            "borderlessgaming.exe".into(),
            "borderlessgaming".into(),
        ]
    }

    fn search_paths(&self) -> Vec<String> {
        vec!["borderless".into(), "Borderless Gaming".into()]
    }

    fn config_schema(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::new("terminate_on_exit", FieldType::Boolean, "Terminate on Exit")
                .with_default(FieldValue::Bool(true))
                .with_help("Close Borderless Gaming when the game exits"),
        ]
    }

    fn build_launch_command(&self, config: &PluginConfig) -> Option<CommandLine> {
        let tool = config.tool()?;
        Some(CommandLine::new(tool)
            .raw_args(&config.options)
            .raw_args(&config.arguments))
    }

    fn should_track_process(&self) -> bool {
        true
    }

    fn should_terminate_on_exit(&self) -> bool {
        true
    }

    fn generic_path_attribute(&self) -> Option<&str> {
        Some("borderless_app_path")
    }

    fn documentation_url(&self) -> Option<&str> {
        Some("https://github.com/Codeusa/Borderless-Gaming")
    }
}
