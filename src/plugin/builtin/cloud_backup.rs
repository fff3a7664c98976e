//! Cloud save backup plugins (rclone and Ludusavi)
//!
//! Both are direction aware: the launch command pulls saves down and the exit
//! command pushes them back up, each gated by its own schema flag.

use crate::plugin::command::CommandLine;
use crate::plugin::traits::{ConfigField, FieldType, FieldValue, PluginCategory, PluginConfig, ToolPlugin};

/// Which way a backup tool moves save data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Launch: cloud to local
    Restore,
    /// Exit: local to cloud
    Backup,
}

impl Direction {
    fn enabled(self, config: &PluginConfig) -> bool {
        match self {
            Direction::Restore => config.get_bool("backup_on_launch", false),
            Direction::Backup => config.get_bool("backup_on_exit", true),
        }
    }
}

fn direction_flags() -> [ConfigField; 2] {
    [
        ConfigField::new("backup_on_launch", FieldType::Boolean, "Restore on Launch")
            .with_default(FieldValue::Bool(false))
            .with_help("Download saves before the game starts"),
        ConfigField::new("backup_on_exit", FieldType::Boolean, "Backup on Exit")
            .with_default(FieldValue::Bool(true))
            .with_help("Upload saves after the game exits"),
    ]
}

/// Plugin for rclone cloud sync
#[derive(Debug, Default)]
pub struct RcloneBackupPlugin;

impl RcloneBackupPlugin {
    pub fn new() -> Self {
        Self
    }

    fn sync_command(&self, config: &PluginConfig, direction: Direction) -> Option<CommandLine> {
        let tool = config.tool()?;
        if !direction.enabled(config) {
            return None;
        }

        let remote = format!("{}{}", config.get_text("remote_name")?, config.get_text("remote_path")?);
        let local = config.get_path("local_path")?.to_string_lossy().into_owned();
        let mode = config.get_text("sync_mode").unwrap_or("sync");

        let (source, destination) = match direction {
            Direction::Restore => (remote, local),
            Direction::Backup => (local, remote),
        };

        Some(CommandLine::new(tool)
            .args([mode, source.as_str(), destination.as_str(), "--verbose", "--progress"])
            .raw_args(&config.options)
            .raw_args(&config.arguments))
    }
}

impl ToolPlugin for RcloneBackupPlugin {
    fn name(&self) -> &str {
        "rclone"
    }

    fn display_name(&self) -> &str {
        "Rclone Cloud Backup"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Sync
    }

    fn description(&self) -> &str {
        "Sync save games and configs to cloud storage"
    }

    fn executable_patterns(&self) -> Vec<String> {
        vec!["rclone.exe".into(), "rclone".into()]
    }

    fn config_schema(&self) -> Vec<ConfigField> {
        let mut schema = vec![
            ConfigField::new("remote_name", FieldType::String, "Remote Name")
                .required()
                .with_help("Name of the rclone remote, e.g. \"gdrive:\""),
            ConfigField::new("local_path", FieldType::Directory, "Local Save Directory")
                .required(),
            ConfigField::new("remote_path", FieldType::String, "Remote Path")
                .required()
                .with_help("Path on the remote, e.g. \"GameSaves/MyGame\""),
            ConfigField::new("sync_mode", FieldType::String, "Sync Mode")
                .with_default(FieldValue::Text("sync".to_string()))
                .with_help("sync, copy or copyto"),
        ];
        schema.extend(direction_flags());
        schema
    }

    fn build_launch_command(&self, config: &PluginConfig) -> Option<CommandLine> {
        self.sync_command(config, Direction::Restore)
    }

    fn build_exit_command(&self, config: &PluginConfig) -> Option<CommandLine> {
        self.sync_command(config, Direction::Backup)
    }

    fn supports_exit_action(&self) -> bool {
        true
    }

    fn should_track_process(&self) -> bool {
        false
    }

    fn generic_path_attribute(&self) -> Option<&str> {
        Some("cloud_app_path")
    }

    fn documentation_url(&self) -> Option<&str> {
        Some("https://rclone.org/docs/")
    }
}

/// Plugin for Ludusavi save backup
#[derive(Debug, Default)]
pub struct LudusaviBackupPlugin;

impl LudusaviBackupPlugin {
    pub fn new() -> Self {
        Self
    }

    fn backup_command(&self, config: &PluginConfig, direction: Direction) -> Option<CommandLine> {
        let tool = config.tool()?;
        if !direction.enabled(config) {
            return None;
        }
        let backup_path = config.get_path("backup_path")?;

        let verb = match direction {
            Direction::Restore => "restore",
            Direction::Backup => "backup",
        };
        let mut cmd = CommandLine::new(tool)
            .args([verb, "--path"])
            .path_arg(backup_path);

        if let Some(game) = config.get_text("game_name") {
            cmd = cmd.arg("--by-name").arg(game);
        }

        Some(cmd.raw_args(&config.options))
    }
}

impl ToolPlugin for LudusaviBackupPlugin {
    fn name(&self) -> &str {
        "ludusavi"
    }

    fn display_name(&self) -> &str {
        "Ludusavi Save Backup"
    }

    fn category(&self) -> PluginCategory {
        PluginCategory::Sync
    }

    fn description(&self) -> &str {
        "Backup and restore game saves using Ludusavi"
    }

    fn executable_patterns(&self) -> Vec<String> {
        vec!["ludusavi.exe".into(), "ludusavi".into()]
    }

    fn config_schema(&self) -> Vec<ConfigField> {
        let mut schema = vec![
            ConfigField::new("backup_path", FieldType::Directory, "Backup Directory")
                .required()
                .with_help("Directory where backups are stored"),
            ConfigField::new("game_name", FieldType::String, "Game Name")
                .with_help("Specific game to back up, empty for all"),
        ];
        schema.extend(direction_flags());
        schema
    }

    fn build_launch_command(&self, config: &PluginConfig) -> Option<CommandLine> {
        self.backup_command(config, Direction::Restore)
    }

    fn build_exit_command(&self, config: &PluginConfig) -> Option<CommandLine> {
        self.backup_command(config, Direction::Backup)
    }

    fn supports_exit_action(&self) -> bool {
        true
    }

    fn should_track_process(&self) -> bool {
        false
    }

    fn generic_path_attribute(&self) -> Option<&str> {
        Some("cloud_app_path")
    }

    fn documentation_url(&self) -> Option<&str> {
        Some("https://github.com/mtkennerly/ludusavi")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn rclone_config(tool: PathBuf, on_launch: bool, on_exit: bool) -> PluginConfig {
        PluginConfig::new(Some(tool))
            .with_field("remote_name", FieldValue::Text("gdrive:".into()))
            .with_field("remote_path", FieldValue::Text("Saves/Game".into()))
            .with_field("local_path", FieldValue::Path(PathBuf::from("/saves/game")))
            .with_field("backup_on_launch", FieldValue::Bool(on_launch))
            .with_field("backup_on_exit", FieldValue::Bool(on_exit))
    }

    #[test]
    fn test_rclone_launch_disabled_exit_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("rclone");
        std::fs::write(&tool, b"").unwrap();

        let plugin = RcloneBackupPlugin::new();
        let config = rclone_config(tool, false, true);

        assert!(plugin.build_launch_command(&config).is_none());
        let exit = plugin.build_exit_command(&config).unwrap();
        assert_eq!(
            exit.arguments(),
            &["sync", "/saves/game", "gdrive:Saves/Game", "--verbose", "--progress"]
        );
    }

    #[test]
    fn test_rclone_launch_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("rclone");
        std::fs::write(&tool, b"").unwrap();

        let config = rclone_config(tool, true, false)
            .with_field("sync_mode", FieldValue::Text("copy".into()))
            .with_options("--dry-run");
        let plugin = RcloneBackupPlugin::new();
        let launch = plugin.build_launch_command(&config).unwrap();
        assert_eq!(
            launch.arguments(),
            &["copy", "gdrive:Saves/Game", "/saves/game", "--verbose", "--progress", "--dry-run"]
        );
        assert!(plugin.build_exit_command(&config).is_none());
    }

    #[test]
    fn test_rclone_missing_remote_skips() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("rclone");
        std::fs::write(&tool, b"").unwrap();

        let config = PluginConfig::new(Some(tool))
            .with_field("local_path", FieldValue::Path(PathBuf::from("/saves")));
        assert!(RcloneBackupPlugin::new().build_exit_command(&config).is_none());
    }

    #[test]
    fn test_ludusavi_commands() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("ludusavi");
        std::fs::write(&tool, b"").unwrap();

        let config = PluginConfig::new(Some(tool))
            .with_field("backup_path", FieldValue::Path(PathBuf::from("/backups")))
            .with_field("game_name", FieldValue::Text("Half-Life 2".into()))
            .with_field("backup_on_launch", FieldValue::Bool(true));
        let plugin = LudusaviBackupPlugin::new();

        let launch = plugin.build_launch_command(&config).unwrap();
        assert_eq!(launch.arguments(), &["restore", "--path", "/backups", "--by-name", "Half-Life 2"]);

        // backup_on_exit unset falls back to true
        let exit = plugin.build_exit_command(&config).unwrap();
        assert_eq!(exit.arguments()[0], "backup");
        assert!(exit.to_string().contains("\"Half-Life 2\""));
    }

    #[test]
    fn test_required_fields_validated() {
        let plugin = RcloneBackupPlugin::new();
        let err = plugin.validate_config(&PluginConfig::new(None)).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("Remote Name"));
    }
}
