//! AntiMicroX Controller Mapper Plugin
//!
//! Maps controllers to keyboard/mouse. Launch loads the player profiles
//! (player 2 chained with `--next --profile-controller 2`); exit restarts the
//! mapper with the media-centre profile.

use crate::plugin::command::CommandLine;
use crate::plugin::traits::{ConfigField, FieldType, PluginCategory, PluginConfig, ToolPlugin};

const PROFILE_FILTER: &str = "AntiMicroX Profiles (*.amgp);;All Files (*.*)";

/// Plugin for the AntiMicroX controller mapper
#[derive(Debug, Default)]
pub struct AntiMicroXPlugin;

impl AntiMicroXPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl ToolPlugin for AntiMicroXPlugin {
    fn name(&self) -> &str {
        "antimicrox"
    }

    fn display_name(&self) -> &str {
        "AntiMicroX"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Mappers
    }

    fn description(&self) -> &str {
        "Controller to keyboard/mouse mapper"
    }

    fn executable_patterns(&self) -> Vec<String> {
        vec!["antimicrox.exe".into(), "antimicrox".into()]
    }

    fn search_paths(&self) -> Vec<String> {
        vec!["antimicrox".into(), "AntiMicroX".into(), "antimicrox/bin".into()]
    }

    fn config_schema(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::new("player1_profile", FieldType::File, "Player 1 Profile")
                .with_filter(PROFILE_FILTER)
                .with_help("Controller profile for Player 1"),
            ConfigField::new("player2_profile", FieldType::File, "Player 2 Profile")
                .with_filter(PROFILE_FILTER)
                .with_help("Controller profile for Player 2"),
            ConfigField::new("mediacenter_profile", FieldType::File, "Media Center Profile")
                .with_filter(PROFILE_FILTER)
                .with_help("Controller profile for media center/desktop use"),
        ]
    }

    fn build_launch_command(&self, config: &PluginConfig) -> Option<CommandLine> {
        let tool = config.tool()?;
        let p1 = config.existing_path("player1_profile")?;

        let mut cmd = CommandLine::new(tool)
            .raw_args(&config.options)
            .args(["--tray", "--hidden", "--profile"])
            .path_arg(p1)
            .raw_args(&config.arguments);

        if let Some(p2) = config.existing_path("player2_profile") {
            cmd = cmd
                .args(["--next", "--profile-controller", "2", "--profile"])
                .path_arg(p2);
        }

        Some(cmd)
    }

    fn build_exit_command(&self, config: &PluginConfig) -> Option<CommandLine> {
        let tool = config.tool()?;
        let profile = config.existing_path("mediacenter_profile")?;

        Some(CommandLine::new(tool)
            .args(["--tray", "--hidden", "--profile"])
            .path_arg(profile))
    }

    fn supports_exit_action(&self) -> bool {
        true
    }

    fn should_track_process(&self) -> bool {
        true
    }

    // Restarted with the media-centre profile instead of being terminated
    fn should_terminate_on_exit(&self) -> bool {
        false
    }

    fn generic_path_attribute(&self) -> Option<&str> {
        Some("controller_mapper_path")
    }

    fn documentation_url(&self) -> Option<&str> {
        Some("https://github.com/AntiMicroX/antimicrox")
    }
}
