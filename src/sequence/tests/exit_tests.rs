//! Exit-direction steps: termination, restarts and exit commands

use std::sync::Arc;
use super::fixtures::*;
use crate::plugin::tests::mock_plugins::MockToolPlugin;
use crate::plugin::traits::ToolPlugin;
use crate::process::tests::mock_process::Behaviour;

fn borderless_config(ws: &Workspace, extra: &str) -> String {
    let tool = ws.tool("borderless.exe");
    format!(
        "[sequences]\nlaunch_sequence = \"Borderless\"\nexit_sequence = \"Borderless\"\n[attributes]\nborderless_app_path = {}\n{}",
        lit(&tool),
        extra
    )
}

#[test]
fn test_exit_borderless_terminates_tracked_process() {
    let ws = Workspace::new();
    let context = context(&borderless_config(&ws, ""));
    let harness = Harness::new();
    let mut executor = harness.executor(&context);

    executor.execute("launch_sequence");
    let pid = executor.lifecycle().tracked_pid("borderless").unwrap();

    let report = executor.execute("exit_sequence");

    assert_eq!(report.ran(), vec!["Borderless"]);
    assert!(!harness.table.running(pid));
    assert!(!executor.lifecycle().is_tracked("borderless"));
    // Exit does not launch Borderless a second time
    assert_eq!(harness.runner.runs().len(), 1);
    assert!(harness.status.contains(&format!("Process {} terminated.", pid)));
}

#[test]
fn test_exit_borderless_falls_back_to_process_name() {
    let ws = Workspace::new();
    let context = context(&borderless_config(&ws, ""));
    let harness = Harness::new();
    harness.table.spawn(70, 1, "Borderless.exe", Behaviour::ExitsOnTerminate);
    let mut executor = harness.executor(&context);

    let report = executor.execute("exit_sequence");

    assert_eq!(report.ran(), vec!["Borderless"]);
    assert!(!harness.table.running(70));
    assert!(harness.status.contains("Closing borderless.exe by name"));
}

#[test]
fn test_exit_borderless_left_running_when_configured() {
    let ws = Workspace::new();
    let context = context(&borderless_config(&ws, "borderless_terminate_on_exit = false\n"));
    let harness = Harness::new();
    let mut executor = harness.executor(&context);

    executor.execute("launch_sequence");
    let report = executor.execute("exit_sequence");

    assert_eq!(report.skipped(), vec!["Borderless"]);
    assert!(executor.lifecycle().is_tracked("borderless"));
    assert!(harness.table.terminate_calls().is_empty());
}

#[test]
fn test_plugin_exit_support_decides_exit_behaviour() {
    let quiet = MockToolPlugin::new("quiet");
    let quiet_exits = quiet.exit_calls();
    let saver = MockToolPlugin::new("saver").with_exit_support();
    let saver_exits = saver.exit_calls();
    let context = context_with(
        "[sequences]\nexit_sequence = [\"Quiet\", \"Saver\"]\n[steps]\nQuiet = \"plugin:quiet\"\nSaver = \"plugin:saver\"\n",
        vec![Arc::new(quiet) as Arc<dyn ToolPlugin>, Arc::new(saver)],
    );
    let harness = Harness::new();
    let mut executor = harness.executor(&context);

    let report = executor.execute("exit_sequence");

    assert_eq!(report.skipped(), vec!["Quiet"]);
    assert_eq!(report.ran(), vec!["Saver"]);
    assert_eq!(*quiet_exits.lock().unwrap(), 0);
    assert_eq!(*saver_exits.lock().unwrap(), 1);
    assert_eq!(harness.runner.commands(), vec!["\"/mock/bin/saver\" --exit"]);
}

#[test]
fn test_controller_mapper_restarts_with_media_centre_profile() {
    let ws = Workspace::new();
    let tool = ws.tool("antimicrox");
    let player1 = ws.tool("player1.amgp");
    let desktop = ws.tool("desktop.amgp");
    let context = context(&format!(
        r#"
[sequences]
launch_sequence = "Controller-Mapper"
exit_sequence = "Controller-Mapper"

[attributes]
controller_mapper_path = {}
antimicrox_player1_profile = {}
antimicrox_mediacenter_profile = {}
"#,
        lit(&tool),
        lit(&player1),
        lit(&desktop)
    ));
    let harness = Harness::new();
    let mut executor = harness.executor(&context);

    executor.execute("launch_sequence");
    let first = executor.lifecycle().tracked_pid("antimicrox").unwrap();

    let report = executor.execute("exit_sequence");
    assert_eq!(report.ran(), vec!["Controller-Mapper"]);

    let runs = harness.runner.runs();
    assert_eq!(runs.len(), 2);
    let exit_args = runs[1].command.arguments();
    assert_eq!(exit_args.last().map(String::as_str), Some(&*desktop.to_string_lossy()));
    assert!(!harness.table.running(first));

    // The media-centre mapper is left running past cleanup
    let second = runs[1].pid.unwrap();
    assert_ne!(first, second);
    assert!(!executor.lifecycle().is_tracked("antimicrox"));
    executor.ensure_cleanup();
    assert!(harness.table.running(second));
    assert!(!harness.table.kill_calls().contains(&second));
}

#[test]
fn test_controller_mapper_exit_without_profile_only_stops() {
    let ws = Workspace::new();
    let tool = ws.tool("antimicrox");
    let player1 = ws.tool("player1.amgp");
    let context = context(&format!(
        "[sequences]\nlaunch_sequence = \"Controller-Mapper\"\nexit_sequence = \"Controller-Mapper\"\n[attributes]\nantimicrox_path = {}\nantimicrox_player1_profile = {}\n",
        lit(&tool),
        lit(&player1)
    ));
    let harness = Harness::new();
    let mut executor = harness.executor(&context);

    executor.execute("launch_sequence");
    let report = executor.execute("exit_sequence");

    assert_eq!(report.ran(), vec!["Controller-Mapper"]);
    assert_eq!(harness.runner.runs().len(), 1);
    assert_eq!(executor.lifecycle().tracked_count(), 0);
}

#[test]
fn test_cloud_sync_uploads_only_on_exit() {
    let ws = Workspace::new();
    let tool = ws.tool("rclone");
    let saves = ws.path().join("saves");
    std::fs::create_dir(&saves).unwrap();
    let context = context(&format!(
        r#"
[sequences]
launch_sequence = "Cloud-Sync"
exit_sequence = "Cloud-Sync"

[attributes]
cloud_app_path = {}
rclone_remote_name = "gdrive:"
rclone_remote_path = "Saves/Quake"
rclone_local_path = {}
"#,
        lit(&tool),
        lit(&saves)
    ));
    let harness = Harness::new();
    let mut executor = harness.executor(&context);

    let launch = executor.execute("launch_sequence");
    assert_eq!(launch.skipped(), vec!["Cloud-Sync"]);
    assert!(harness.runner.runs().is_empty());

    let exit = executor.execute("exit_sequence");
    assert_eq!(exit.ran(), vec!["Cloud-Sync"]);

    let runs = harness.runner.runs();
    assert_eq!(runs.len(), 1);
    let args = runs[0].command.arguments();
    assert_eq!(args[0], "sync");
    assert_eq!(args[1], saves.to_string_lossy());
    assert_eq!(args[2], "gdrive:Saves/Quake");
    assert_eq!(executor.lifecycle().tracked_count(), 0);
}

#[test]
fn test_step_mapping_overrides_builtin_name() {
    let ws = Workspace::new();
    let tool = ws.tool("custom.exe");
    let context = context(&format!(
        "[sequences]\nlaunch_sequence = \"Overlay\"\n[steps]\nOverlay = \"app:overlay_app\"\n[attributes]\noverlay_app_path = {}\n",
        lit(&tool)
    ));
    let harness = Harness::new();
    let mut executor = harness.executor(&context);

    let report = executor.execute("launch_sequence");

    assert_eq!(report.ran(), vec!["Overlay"]);
    assert!(executor.lifecycle().is_tracked("Overlay"));
}
