mod common;

use common::{Doubles, GameDir};
use gamewrap::sequence::LauncherContext;

const FULL_RUN: &str = r#"
[game]
name = "Quake"
executable = '{dir}/quake.exe'

[sequences]
launch_sequence = ["Pre1", "Bogus-Step", "Borderless", "Cloud-Sync"]
exit_sequence = ["Cloud-Sync", "Borderless", "Post1"]

[attributes]
pre_launch_app_1_path = '$GAMEDIR/tools/pre.exe'
post_launch_app_1_path = '$GAMEDIR/tools/post.exe'
post_launch_app_1_wait = true
borderless_app_path = '$GAMEDIR/tools/borderless.exe'
cloud_app_path = '$GAMEDIR/tools/rclone'
rclone_remote_name = "gdrive:"
rclone_remote_path = "Saves/Quake"
rclone_local_path = '$GAMEDIR/saves'
"#;

fn full_run_dir() -> GameDir {
    let game = GameDir::new();
    game.tool("quake.exe");
    game.tool("tools/pre.exe");
    game.tool("tools/post.exe");
    game.tool("tools/borderless.exe");
    game.tool("tools/rclone");
    std::fs::create_dir(game.path().join("saves")).unwrap();
    game.write_config(FULL_RUN);
    game
}

#[test]
fn test_full_run_from_config_file() {
    let game = full_run_dir();
    let context = LauncherContext::new(game.load());
    let doubles = Doubles::new();
    let mut executor = doubles.executor(&context);

    assert!(executor.preflight().iter().any(|w| w.step == "Bogus-Step"));

    let launch = executor.execute("launch_sequence");
    assert_eq!(launch.processed(), vec!["Pre1", "Bogus-Step", "Borderless", "Cloud-Sync"]);
    assert_eq!(launch.unknown(), vec!["Bogus-Step"]);
    // rclone only uploads on exit by default
    assert_eq!(launch.skipped(), vec!["Cloud-Sync"]);

    let exit = executor.execute("exit_sequence");
    assert_eq!(exit.ran(), vec!["Cloud-Sync", "Borderless", "Post1"]);

    let commands = doubles.runner.commands();
    assert_eq!(commands.len(), 4);
    assert!(commands[0].contains("pre.exe"));
    assert!(commands[1].contains("borderless.exe"));
    assert!(commands[2].contains("rclone"));
    assert!(commands[2].contains("gdrive:Saves/Quake"));
    assert!(commands[3].contains("post.exe"));
    assert_eq!(doubles.runner.waited(), vec![false, false, false, true]);

    // Borderless was stopped by its exit step; only Pre1 is left for cleanup
    assert_eq!(executor.lifecycle().tracked_keys(), vec!["Pre1"]);
    let report = executor.ensure_cleanup();
    assert_eq!(report.graceful.len(), 1);
    assert_eq!(executor.lifecycle().tracked_count(), 0);
}

#[test]
fn test_cleanup_twice_sends_nothing_new() {
    let game = full_run_dir();
    let context = LauncherContext::new(game.load());
    let doubles = Doubles::new();
    let mut executor = doubles.executor(&context);

    executor.execute("launch_sequence");
    executor.ensure_cleanup();
    let terminated = doubles.table.terminated();

    let second = executor.ensure_cleanup();

    assert!(second.is_empty());
    assert_eq!(doubles.table.terminated(), terminated);
}

#[test]
fn test_missing_generic_tool_launches_nothing() {
    let game = GameDir::new();
    game.write_config(
        "[sequences]\nlaunch_sequence = \"Pre1\"\nexit_sequence = \"Taskbar\"\n[attributes]\npre_launch_app_1_path = '{dir}/missing.exe'\n",
    );
    let context = LauncherContext::new(game.load());
    let doubles = Doubles::new();
    let mut executor = doubles.executor(&context);

    let report = executor.execute("launch_sequence");

    assert_eq!(report.skipped(), vec!["Pre1"]);
    assert!(doubles.runner.commands().is_empty());
    assert_eq!(executor.preflight().len(), 1);
}

#[test]
fn test_profile_overlay_changes_sequence() {
    let game = GameDir::new();
    game.tool("tools/pre.exe");
    game.tool("tools/post.exe");
    game.write_config(
        r#"
[sequences]
launch_sequence = "Pre1"

[attributes]
pre_launch_app_1_path = '{dir}/tools/pre.exe'
pre_launch_app_2_path = '{dir}/tools/post.exe'

[deck.sequences]
launch_sequence = "Pre2"
"#,
    );
    let mut config = game.load();
    config.select_section("deck".to_string());
    let context = LauncherContext::new(config);
    let doubles = Doubles::new();
    let mut executor = doubles.executor(&context);

    let report = executor.execute("launch_sequence");

    assert_eq!(report.ran(), vec!["Pre2"]);
    assert!(doubles.runner.commands()[0].contains("post.exe"));
}

#[test]
fn test_kill_list_sweep_after_run() {
    let game = GameDir::new();
    game.write_config(
        "[options]\nuse-kill-list = true\nkill-list = [\"Overlay.exe\"]\n[sequences]\nlaunch_sequence = \"Taskbar\"\n",
    );
    let context = LauncherContext::new(game.load());
    let doubles = Doubles::new();
    doubles.table.add(900, "overlay.exe");
    let mut executor = doubles.executor(&context);

    let report = executor.sweep_kill_list();

    assert_eq!(report.graceful, vec![900]);
    assert!(!doubles.table.alive(900));
    assert!(doubles.status.contains("Killing process from list: Overlay.exe"));
}
