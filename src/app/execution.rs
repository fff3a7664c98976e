//! Launcher run and the informational commands

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use log::{debug, info, warn};
use crate::backup::SaveBackup;
use crate::config::LAUNCH_SEQUENCE;
use crate::plugin::ToolPlugin;
use crate::process::{SystemCommandRunner, SystemProcessTable};
use crate::sequence::{LauncherContext, SequenceExecutor, SystemAction};
use crate::status::StatusSink;
use crate::{cli, config};

/// Full launcher run: launch sequence, game, exit sequence, cleanup
pub fn run_launcher(args: &cli::Args, config: config::ConfigManager, status: Arc<dyn StatusSink>) -> Result<()> {
    let table = Arc::new(SystemProcessTable::new());
    let options = config.launcher_options()
        .context("Invalid [options] section")?;
    let _instance = super::initialization::acquire_instance(&options, table.as_ref())?;

    let context = super::initialization::create_launcher_context(args, config)?;
    let mut executor = SequenceExecutor::new(
        &context,
        Arc::clone(&status),
        Box::new(SystemCommandRunner::new()),
        table,
    )?;

    report_warnings(&executor, status.as_ref());
    backup_saves(&context.config, status.as_ref());

    if should_mount_before_launch(&context, &executor) {
        if let Err(e) = executor.mount_disc() {
            status.show_error(&format!("Failed to mount disc image: {}", e));
        }
    }

    let launch = executor.execute("launch_sequence");
    debug!("Launch sequence: {} ran, {} failed", launch.ran().len(), launch.failed().len());

    if let Err(e) = executor.run_game() {
        status.show_error(&format!("Failed to launch game: {}", e));
    }

    let exit = executor.execute("exit_sequence");
    debug!("Exit sequence: {} ran, {} failed", exit.ran().len(), exit.failed().len());

    executor.ensure_cleanup();
    executor.sweep_kill_list();

    status.show_message("Exiting launcher");
    info!("Launcher finished for {}", executor.game().name);
    Ok(())
}

/// Mount up front unless the launch sequence does it itself
fn should_mount_before_launch(context: &LauncherContext, executor: &SequenceExecutor<'_>) -> bool {
    if executor.game().iso_path.is_none() {
        return false;
    }
    let steps = context.config.sequence(LAUNCH_SEQUENCE).unwrap_or_default();
    !steps.iter().any(|step| {
        matches!(
            executor.actions().resolve(step.trim(), crate::sequence::Direction::Launch),
            Some(crate::sequence::Action::System(SystemAction::MountDisc))
        )
    })
}

/// Zip the save directory before launch when `backup-saves` is on
fn backup_saves(config: &config::ConfigManager, status: &dyn StatusSink) {
    let backup = match SaveBackup::from_config(config) {
        Ok(Some(backup)) => backup,
        Ok(None) => return,
        Err(e) => {
            status.show_error(&format!("Backup failed: {:#}", e));
            return;
        }
    };

    match backup.run() {
        Ok(Some(outcome)) => {
            status.show_message(&format!("Backed up saves to {}", file_name(&outcome.archive)));
            for old in &outcome.removed {
                status.show_message(&format!("Removed old backup: {}", file_name(old)));
            }
        }
        Ok(None) => status.show_message("Save directory not found, skipping backup."),
        Err(e) => status.show_error(&format!("Backup failed: {:#}", e)),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn report_warnings(executor: &SequenceExecutor<'_>, status: &dyn StatusSink) -> usize {
    let warnings = executor.preflight();
    for warning in &warnings {
        status.show_warning(&format!("Configuration: {}", warning));
    }
    warnings.len()
}

/// Report configuration problems without launching anything
pub fn handle_check(args: &cli::Args, config: config::ConfigManager, status: Arc<dyn StatusSink>) -> Result<()> {
    let source = config.config_file_path()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<memory>".to_string());
    let context = super::initialization::create_launcher_context(args, config)?;
    let executor = SequenceExecutor::new(
        &context,
        Arc::clone(&status),
        Box::new(SystemCommandRunner::new()),
        Arc::new(SystemProcessTable::new()),
    )?;

    let count = report_warnings(&executor, status.as_ref());
    if count == 0 {
        status.show_message(&format!("{}: no problems found", source));
    } else {
        warn!("{} configuration warning(s) in {}", count, source);
        status.show_message(&format!("{}: {} warning(s)", source, count));
    }
    Ok(())
}

/// Print every registered capability grouped by category
pub fn handle_list_plugins(args: &cli::Args, config: config::ConfigManager) -> Result<()> {
    let context = super::initialization::create_launcher_context(args, config)?;

    println!("Available Plugins:");
    println!("==================");
    for category in context.registry.categories() {
        println!();
        println!("{}:", category);
        for name in context.registry.by_category(category) {
            let Some(plugin) = context.registry.resolve(&name) else {
                continue;
            };
            println!("  {}", describe_plugin(plugin.as_ref(), &context));
        }
    }
    Ok(())
}

fn describe_plugin(plugin: &dyn ToolPlugin, context: &LauncherContext) -> String {
    let mut line = format!("{:<18} {} v{}", plugin.name(), plugin.display_name(), plugin.version());
    if !plugin.description().is_empty() {
        line.push_str(&format!(" - {}", plugin.description()));
    }
    if let Some(url) = plugin.documentation_url() {
        line.push_str(&format!(" <{}>", url));
    }
    if let Some(path) = context.manager.get_installed_path(plugin.name(), 0) {
        line.push_str(&format!(" [{}]", path.display()));
    }
    if let Some(module) = context.loader.module(plugin.name()) {
        line.push_str(&format!(" (from {})", module.path.display()));
    }
    line
}

/// Scan the bin root and print every installed tool found
pub fn handle_scan_tools(args: &cli::Args, config: config::ConfigManager) -> Result<()> {
    let context = super::initialization::create_launcher_context(args, config)?;
    let Some(bin_root) = context.manager.bin_root() else {
        println!("No bin root configured; set --bin-root or options.bin-root");
        return Ok(());
    };

    println!("Installed tools under {}:", bin_root.display());
    let mut names: Vec<&String> = context.manager.installed().keys().collect();
    names.sort();
    if names.is_empty() {
        println!("  (none)");
    }
    for name in names {
        for path in &context.manager.installed()[name] {
            println!("  {:<18} {}", name, path.display());
        }
    }
    Ok(())
}
