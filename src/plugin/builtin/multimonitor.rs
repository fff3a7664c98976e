//! MultiMonitorTool Plugin
//!
//! Switches monitor layouts by loading saved configuration files: the gaming
//! layout at launch, the desktop layout at exit.

use std::path::Path;
use crate::plugin::command::CommandLine;
use crate::plugin::traits::{ConfigField, FieldType, PluginCategory, PluginConfig, ToolPlugin};

const LAYOUT_FILTER: &str = "Config Files (*.cfg);;All Files (*.*)";

#[derive(Debug, Default)]
pub struct MultiMonitorToolPlugin;

impl MultiMonitorToolPlugin {
    pub fn new() -> Self {
        Self
    }

    fn load_layout(&self, tool: &Path, layout: &Path, config: &PluginConfig) -> CommandLine {
        CommandLine::new(tool)
            .raw_args(&config.options)
            .arg("/load")
            .path_arg(layout)
            .raw_args(&config.arguments)
    }
}

impl ToolPlugin for MultiMonitorToolPlugin {
    fn name(&self) -> &str {
        "multimonitortool"
    }

    fn display_name(&self) -> &str {
        "MultiMonitorTool"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Display
    }

    fn description(&self) -> &str {
        "Saves and restores multi-monitor layouts"
    }

    fn executable_patterns(&self) -> Vec<String> {
        vec!["multimonitortool.exe".into(), "multimonitortool".into()]
    }

    fn search_paths(&self) -> Vec<String> {
        vec!["multimonitortool".into(), "MultiMonitorTool".into()]
    }

    fn config_schema(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::new("gaming_config", FieldType::File, "Gaming Layout")
                .with_filter(LAYOUT_FILTER)
                .with_help("Monitor layout applied before the game starts"),
            ConfigField::new("desktop_config", FieldType::File, "Desktop Layout")
                .with_filter(LAYOUT_FILTER)
                .with_help("Monitor layout restored after the game exits"),
        ]
    }

    fn build_launch_command(&self, config: &PluginConfig) -> Option<CommandLine> {
        let tool = config.tool()?;
        let layout = config.existing_path("gaming_config")?;
        Some(self.load_layout(tool, layout, config))
    }

    fn build_exit_command(&self, config: &PluginConfig) -> Option<CommandLine> {
        let tool = config.tool()?;
        let layout = config.existing_path("desktop_config")?;
        Some(self.load_layout(tool, layout, config))
    }

    fn supports_exit_action(&self) -> bool {
        true
    }

    // Applies the layout and exits immediately
    fn should_track_process(&self) -> bool {
        false
    }

    fn generic_path_attribute(&self) -> Option<&str> {
        Some("multimonitor_tool_path")
    }

    fn documentation_url(&self) -> Option<&str> {
        Some("https://www.nirsoft.net/utils/multi_monitor_tool.html")
    }
}
