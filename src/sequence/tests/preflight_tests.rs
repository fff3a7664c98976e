use std::sync::Arc;
use super::fixtures::*;
use crate::plugin::tests::mock_plugins::MockToolPlugin;
use crate::plugin::traits::ToolPlugin;

fn warnings_for(context: &crate::sequence::LauncherContext) -> Vec<String> {
    let harness = Harness::new();
    let executor = harness.executor(context);
    executor.preflight().iter().map(ToString::to_string).collect()
}

#[test]
fn test_clean_configuration_has_no_warnings() {
    let ws = Workspace::new();
    let pre = ws.tool("pre.exe");
    let borderless = ws.tool("borderless.exe");
    let context = context(&format!(
        "[sequences]\nlaunch_sequence = [\"Pre1\", \"No-TB\", \"Borderless\"]\nexit_sequence = [\"Borderless\", \"Taskbar\"]\n[attributes]\npre_launch_app_1_path = {}\nborderless_path = {}\n",
        lit(&pre),
        lit(&borderless)
    ));

    assert!(warnings_for(&context).is_empty());
}

#[test]
fn test_unknown_steps_reported_once() {
    let context = context(
        "[sequences]\nlaunch_sequence = [\"Bogus\", \"Bogus\"]\nexit_sequence = \"Bogus\"\n",
    );

    let warnings = warnings_for(&context);

    assert_eq!(warnings, vec![
        "Bogus: unknown step in launch_sequence",
        "Bogus: unknown step in exit_sequence",
    ]);
}

#[test]
fn test_missing_generic_path_reported() {
    let context = context(
        "[sequences]\nlaunch_sequence = [\"Pre1\", \"Pre2\"]\nexit_sequence = \"Taskbar\"\n[attributes]\npre_launch_app_1_path = '/no/such/pre.exe'\n",
    );

    let warnings = warnings_for(&context);

    // Pre2 is simply unconfigured
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Pre1: "));
    assert!(warnings[0].contains("does not exist"));
}

#[test]
fn test_plugin_without_tool_reported() {
    let context = context("[sequences]\nlaunch_sequence = \"Borderless\"\nexit_sequence = \"Taskbar\"\n");

    let warnings = warnings_for(&context);

    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("no tool path for Borderless Gaming"));
}

#[test]
fn test_plugin_missing_required_field_reported() {
    let ws = Workspace::new();
    let rclone = ws.tool("rclone");
    let context = context(&format!(
        "[sequences]\nlaunch_sequence = \"Cloud-Sync\"\nexit_sequence = \"Taskbar\"\n[attributes]\nrclone_path = {}\nrclone_remote_name = \"gdrive:\"\n",
        lit(&rclone)
    ));

    let warnings = warnings_for(&context);

    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Cloud-Sync: "));
}

#[test]
fn test_invalid_mapping_and_unregistered_plugin() {
    let context = context_with(
        "[sequences]\nlaunch_sequence = [\"Ghost\", \"Mock\"]\nexit_sequence = \"Taskbar\"\n[steps]\nWeird = \"shell:rm\"\nGhost = \"plugin:ghost\"\nMock = \"plugin:mock\"\n",
        vec![Arc::new(MockToolPlugin::new("mock")) as Arc<dyn ToolPlugin>],
    );

    let warnings = warnings_for(&context);

    assert!(warnings.iter().any(|w| w.starts_with("Weird: step mapping 'shell:rm'")));
    assert!(warnings.iter().any(|w| w == "Ghost: plugin 'ghost' is not registered"));
    assert!(warnings.iter().any(|w| w.starts_with("Mock: no tool path")));
}
