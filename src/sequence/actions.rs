//! Action tables
//!
//! Map step names to what they do. Launch sequences consult only the shared
//! table; exit sequences consult the exit table first.

use std::collections::HashMap;
use std::fmt;
use crate::config::EXIT_SEQUENCE;

/// Which way a sequence runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Launch,
    Exit,
}

impl Direction {
    pub fn of_sequence(name: &str) -> Self {
        if name == EXIT_SEQUENCE {
            Direction::Exit
        } else {
            Direction::Launch
        }
    }
}

/// Built-in actions that touch the OS directly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemAction {
    HideTaskbar,
    ShowTaskbar,
    KillGame,
    KillList,
    MountDisc,
    UnmountDisc,
}

impl fmt::Display for SystemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SystemAction::HideTaskbar => "hide taskbar",
            SystemAction::ShowTaskbar => "show taskbar",
            SystemAction::KillGame => "kill game",
            SystemAction::KillList => "kill list",
            SystemAction::MountDisc => "mount disc",
            SystemAction::UnmountDisc => "unmount disc",
        };
        f.write_str(name)
    }
}

/// What a step name resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    System(SystemAction),
    /// Run the named capability's launch or exit command
    Plugin(String),
    /// Run the app described by `{prefix}_path|_wait|_options|_arguments`
    Generic(String),
    /// Exit only: stop the capability's tracked process, or kill it by name
    TerminatePlugin(String),
    /// Exit only: stop the tracked process, then run the exit command
    RestartWithExit(String),
}

impl Action {
    /// Capability this action drives, if any
    pub fn plugin_name(&self) -> Option<&str> {
        match self {
            Action::Plugin(name) | Action::TerminatePlugin(name) | Action::RestartWithExit(name) => Some(name),
            _ => None,
        }
    }
}

/// Parse a `[steps]` mapping: `plugin:<name>` or `app:<prefix>`
pub fn parse_step_target(target: &str) -> Option<Action> {
    let (kind, value) = target.trim().split_once(':')?;
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match kind.trim().to_lowercase().as_str() {
        "plugin" => Some(Action::Plugin(value.to_string())),
        "app" => Some(Action::Generic(value.to_string())),
        _ => None,
    }
}

/// A `[steps]` entry that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStep {
    pub step: String,
    pub target: String,
}

#[derive(Debug, Clone)]
pub struct ActionTable {
    shared: HashMap<String, Action>,
    exit: HashMap<String, Action>,
}

impl ActionTable {
    /// The built-in step names
    pub fn standard() -> Self {
        let mut shared = HashMap::new();

        let system = [
            ("Kill-Game", SystemAction::KillGame),
            ("Kill-List", SystemAction::KillList),
            ("No-TB", SystemAction::HideTaskbar),
            ("Taskbar", SystemAction::ShowTaskbar),
            ("mount-disc", SystemAction::MountDisc),
            ("Unmount-disc", SystemAction::UnmountDisc),
        ];
        for (step, action) in system {
            shared.insert(step.to_string(), Action::System(action));
        }

        let plugins = [
            ("Controller-Mapper", "antimicrox"),
            ("Monitor-Config", "multimonitortool"),
            ("Borderless", "borderless"),
            ("Cloud-Sync", "rclone"),
        ];
        for (step, plugin) in plugins {
            shared.insert(step.to_string(), Action::Plugin(plugin.to_string()));
        }

        for n in 1..=3 {
            shared.insert(format!("Pre{}", n), Action::Generic(format!("pre_launch_app_{}", n)));
            shared.insert(format!("Post{}", n), Action::Generic(format!("post_launch_app_{}", n)));
        }
        shared.insert("JustAfterLaunch".to_string(), Action::Generic("just_after_launch_app".to_string()));
        shared.insert("JustBeforeExit".to_string(), Action::Generic("just_before_exit_app".to_string()));

        let mut exit = HashMap::new();
        exit.insert("Borderless".to_string(), Action::TerminatePlugin("borderless".to_string()));
        exit.insert("Controller-Mapper".to_string(), Action::RestartWithExit("antimicrox".to_string()));

        Self { shared, exit }
    }

    /// Merge `[steps]` overrides into the shared table, returning the
    /// entries that could not be parsed
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<InvalidStep> {
        let mut invalid = Vec::new();
        for (step, target) in overrides {
            match parse_step_target(target) {
                Some(action) => {
                    self.shared.insert(step.trim().to_string(), action);
                }
                None => invalid.push(InvalidStep { step: step.clone(), target: target.clone() }),
            }
        }
        invalid.sort_by(|a, b| a.step.cmp(&b.step));
        invalid
    }

    /// Resolve a trimmed step name. The exit table wins during exit sequences.
    pub fn resolve(&self, step: &str, direction: Direction) -> Option<&Action> {
        if direction == Direction::Exit {
            if let Some(action) = self.exit.get(step) {
                return Some(action);
            }
        }
        self.shared.get(step)
    }

    pub fn shared_steps(&self) -> Vec<&str> {
        let mut steps: Vec<&str> = self.shared.keys().map(String::as_str).collect();
        steps.sort_unstable();
        steps
    }
}

impl Default for ActionTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_sequence_name() {
        assert_eq!(Direction::of_sequence("exit_sequence"), Direction::Exit);
        assert_eq!(Direction::of_sequence("launch_sequence"), Direction::Launch);
        assert_eq!(Direction::of_sequence("anything"), Direction::Launch);
    }

    #[test]
    fn test_exit_table_wins_only_on_exit() {
        let table = ActionTable::standard();
        assert_eq!(
            table.resolve("Borderless", Direction::Launch),
            Some(&Action::Plugin("borderless".to_string()))
        );
        assert_eq!(
            table.resolve("Borderless", Direction::Exit),
            Some(&Action::TerminatePlugin("borderless".to_string()))
        );
        assert_eq!(
            table.resolve("Monitor-Config", Direction::Exit),
            Some(&Action::Plugin("multimonitortool".to_string()))
        );
    }

    #[test]
    fn test_names_match_exactly() {
        let table = ActionTable::standard();
        assert!(table.resolve("borderless", Direction::Launch).is_none());
        assert!(table.resolve("Unmount-disc", Direction::Exit).is_some());
        assert!(table.resolve("unmount-disc", Direction::Exit).is_none());
    }

    #[test]
    fn test_generic_prefixes() {
        let table = ActionTable::standard();
        assert_eq!(
            table.resolve("Post3", Direction::Exit),
            Some(&Action::Generic("post_launch_app_3".to_string()))
        );
        assert_eq!(
            table.resolve("JustBeforeExit", Direction::Exit),
            Some(&Action::Generic("just_before_exit_app".to_string()))
        );
    }

    #[test]
    fn test_overrides() {
        let mut table = ActionTable::standard();
        let overrides: HashMap<String, String> = [
            ("Cloud-Sync", "plugin:ludusavi"),
            ("Tweak", "app: tweak_app"),
            ("Broken", "shell:rm"),
            ("Empty", "plugin:"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let invalid = table.apply_overrides(&overrides);
        assert_eq!(invalid.len(), 2);
        assert_eq!(invalid[0].step, "Broken");

        assert_eq!(
            table.resolve("Cloud-Sync", Direction::Launch),
            Some(&Action::Plugin("ludusavi".to_string()))
        );
        assert_eq!(
            table.resolve("Tweak", Direction::Exit),
            Some(&Action::Generic("tweak_app".to_string()))
        );
    }

    #[test]
    fn test_plugin_name() {
        assert_eq!(Action::RestartWithExit("antimicrox".into()).plugin_name(), Some("antimicrox"));
        assert_eq!(Action::System(SystemAction::KillGame).plugin_name(), None);
    }
}
