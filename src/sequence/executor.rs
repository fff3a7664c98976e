//! Sequence Executor
//!
//! Runs a named sequence step by step. Each step name resolves to a system,
//! plugin or generic action; whatever a step does, failures and panics stop
//! at the step boundary and the loop always reaches the end of the list.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use log::{debug, error, info, warn};
use crate::config::{GameInfo, LauncherOptions, StepAttributes};
use crate::plugin::command::CommandLine;
use crate::plugin::config::{build_plugin_config, AttributeSource};
use crate::plugin::error::PluginError;
use crate::plugin::traits::{parse_bool, PluginConfig, ToolPlugin};
use crate::process::{CommandRunner, ProcessLifecycleManager, ProcessTable, TerminationReport};
use crate::status::StatusSink;
use super::actions::{Action, ActionTable, Direction, InvalidStep, SystemAction};
use super::context::LauncherContext;
use super::error::{StepError, StepResult};
use super::preflight::{self, ConfigWarning};
use super::system::{elevated_command, DiscMount, TaskbarControl};

/// What happened to one step
#[derive(Debug, Clone)]
pub enum StepStatus {
    /// A command ran or a toggle flipped
    Ran,
    /// Nothing to do: unconfigured, disabled or the builder returned nothing
    Skipped,
    /// The name resolved to no action
    Unknown,
    Failed(StepError),
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
}

/// Outcome of one `execute` call, in step order
#[derive(Debug, Clone, Default)]
pub struct SequenceReport {
    pub sequence: String,
    pub steps: Vec<StepRecord>,
}

impl SequenceReport {
    /// Every non-empty step name, in order
    pub fn processed(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name.as_str()).collect()
    }

    pub fn ran(&self) -> Vec<&str> {
        self.names_where(|status| matches!(status, StepStatus::Ran))
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.names_where(|status| matches!(status, StepStatus::Skipped))
    }

    pub fn unknown(&self) -> Vec<&str> {
        self.names_where(|status| matches!(status, StepStatus::Unknown))
    }

    pub fn failed(&self) -> Vec<(&str, &StepError)> {
        self.steps.iter()
            .filter_map(|step| match &step.status {
                StepStatus::Failed(e) => Some((step.name.as_str(), e)),
                _ => None,
            })
            .collect()
    }

    fn names_where(&self, predicate: impl Fn(&StepStatus) -> bool) -> Vec<&str> {
        self.steps.iter()
            .filter(|step| predicate(&step.status))
            .map(|step| step.name.as_str())
            .collect()
    }
}

pub struct SequenceExecutor<'a> {
    context: &'a LauncherContext,
    status: Arc<dyn StatusSink>,
    runner: Box<dyn CommandRunner>,
    lifecycle: ProcessLifecycleManager,
    actions: ActionTable,
    invalid_steps: Vec<InvalidStep>,
    options: LauncherOptions,
    game: GameInfo,
    taskbar: TaskbarControl,
    disc: DiscMount,
}

impl<'a> SequenceExecutor<'a> {
    pub fn new(
        context: &'a LauncherContext,
        status: Arc<dyn StatusSink>,
        runner: Box<dyn CommandRunner>,
        table: Arc<dyn ProcessTable>,
    ) -> anyhow::Result<Self> {
        let options = context.config.launcher_options()?;
        let mut game = context.config.game_info();
        let attributes = context.config.step_attributes();
        game.iso_path = game.iso_path.map(|iso| attributes.resolve_path(&iso.to_string_lossy()));

        let mut actions = ActionTable::standard();
        let invalid_steps = actions.apply_overrides(&context.config.step_overrides());
        for invalid in &invalid_steps {
            warn!("Ignoring step mapping {} = '{}'", invalid.step, invalid.target);
        }

        Ok(Self {
            context,
            status,
            runner,
            lifecycle: ProcessLifecycleManager::new(table, options.terminate_timeout),
            actions,
            invalid_steps,
            taskbar: TaskbarControl::from_options(&options),
            disc: DiscMount::from_config(&game, &options),
            options,
            game,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.lifecycle.set_poll_interval(interval);
        self
    }

    pub fn with_disc(mut self, disc: DiscMount) -> Self {
        self.disc = disc;
        self
    }

    pub fn lifecycle(&self) -> &ProcessLifecycleManager {
        &self.lifecycle
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    pub fn options(&self) -> &LauncherOptions {
        &self.options
    }

    pub fn game(&self) -> &GameInfo {
        &self.game
    }

    pub fn taskbar_hidden(&self) -> bool {
        self.taskbar.is_hidden()
    }

    pub fn disc_mounted(&self) -> bool {
        self.disc.is_mounted()
    }

    /// Run every step of the named sequence in order
    pub fn execute(&mut self, sequence_name: &str) -> SequenceReport {
        let mut report = SequenceReport {
            sequence: sequence_name.to_string(),
            steps: Vec::new(),
        };
        let direction = Direction::of_sequence(sequence_name);

        // Re-read on every call so a reloaded configuration takes effect
        let steps = match self.context.config.sequence(sequence_name) {
            Ok(steps) => steps,
            Err(e) => {
                self.status.show_error(&format!("Cannot read {}: {:#}", sequence_name, e));
                return report;
            }
        };
        let attributes = self.context.config.step_attributes();

        self.status.show_message(&format!("Executing {}...", sequence_name));
        info!("Executing sequence: {}", sequence_name);

        for raw in &steps {
            let item = raw.trim();
            if item.is_empty() {
                continue;
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.run_step(item, direction, &attributes)
            }));

            let status = match outcome {
                Ok(Ok(StepStatus::Unknown)) => {
                    self.status.show_warning(&format!("  - Unknown action: {}", item));
                    StepStatus::Unknown
                }
                Ok(Ok(status)) => status,
                Ok(Err(e)) => self.step_failed(item, e),
                Err(payload) => self.step_failed(item, StepError::panicked(item, payload)),
            };

            report.steps.push(StepRecord { name: item.to_string(), status });
        }

        report
    }

    fn step_failed(&self, item: &str, e: StepError) -> StepStatus {
        self.status.show_error(&format!("  - Error executing '{}': {}", item, e));
        error!("Error executing sequence item '{}': {}", item, e);
        StepStatus::Failed(e)
    }

    fn run_step(&mut self, step: &str, direction: Direction, attributes: &StepAttributes) -> StepResult<StepStatus> {
        let Some(action) = self.actions.resolve(step, direction).cloned() else {
            return Ok(StepStatus::Unknown);
        };

        self.status.show_message(&format!("  - Running: {}", step));
        debug!("  - Action: {} -> {:?}", step, action);

        match action {
            Action::System(system) => self.run_system(system),
            Action::Plugin(name) => self.run_plugin(&name, direction, attributes),
            Action::Generic(prefix) => self.run_generic(step, &prefix, attributes),
            Action::TerminatePlugin(name) => self.terminate_plugin(&name, attributes),
            Action::RestartWithExit(name) => self.restart_with_exit(&name, attributes),
        }
    }

    fn run_system(&mut self, action: SystemAction) -> StepResult<StepStatus> {
        debug!("System action: {}", action);
        let ran = match action {
            SystemAction::HideTaskbar => self.taskbar.hide(self.runner.as_ref())?,
            SystemAction::ShowTaskbar => self.taskbar.show(self.runner.as_ref())?,
            SystemAction::KillGame => self.kill_game(),
            SystemAction::KillList => {
                self.sweep_kill_list();
                self.options.use_kill_list && !self.options.kill_list.is_empty()
            }
            SystemAction::MountDisc => self.disc.mount(self.runner.as_ref())?,
            SystemAction::UnmountDisc => self.disc.unmount(self.runner.as_ref())?,
        };
        Ok(if ran { StepStatus::Ran } else { StepStatus::Skipped })
    }

    fn resolve_plugin(&self, name: &str) -> StepResult<Arc<dyn ToolPlugin>> {
        self.context.registry.resolve(name)
            .ok_or_else(|| PluginError::plugin_not_found(name).into())
    }

    fn plugin_config(&self, plugin: &dyn ToolPlugin, attributes: &StepAttributes) -> StepResult<PluginConfig> {
        let installed = self.context.manager.get_installed_path(plugin.name(), 0);
        Ok(build_plugin_config(plugin, attributes, installed)?)
    }

    fn run_plugin(&mut self, name: &str, direction: Direction, attributes: &StepAttributes) -> StepResult<StepStatus> {
        let plugin = self.resolve_plugin(name)?;
        let config = self.plugin_config(plugin.as_ref(), attributes)?;
        if !config.enabled {
            debug!("Plugin '{}' is disabled", name);
            return Ok(StepStatus::Skipped);
        }

        let command = match direction {
            Direction::Launch => plugin.build_launch_command(&config),
            Direction::Exit if plugin.supports_exit_action() => plugin.build_exit_command(&config),
            Direction::Exit => None,
        };

        match command {
            Some(command) => {
                info!("Executing plugin command for {}: {}", plugin.display_name(), command);
                self.launch(name, &command, config.wait, None, plugin.should_track_process())
            }
            None => {
                debug!("Plugin '{}' has nothing to run", name);
                Ok(StepStatus::Skipped)
            }
        }
    }

    fn terminate_plugin(&mut self, name: &str, attributes: &StepAttributes) -> StepResult<StepStatus> {
        let plugin = self.resolve_plugin(name)?;
        let config = self.plugin_config(plugin.as_ref(), attributes)?;
        if !plugin.should_terminate_on_exit() || !config.get_bool("terminate_on_exit", true) {
            debug!("'{}' is left running on exit", name);
            return Ok(StepStatus::Skipped);
        }

        let mut on_exit = self.exit_reporter();
        if let Some(report) = self.lifecycle.terminate_tracked(name, &mut on_exit) {
            self.report_failures(&report);
            return Ok(StepStatus::Ran);
        }

        // Not started by this run; fall back to the executable name
        match plugin.process_name(&config) {
            Some(process) => {
                self.status.show_message(&format!("  - Closing {} by name", process));
                let report = self.lifecycle.kill_by_name(&process, &mut on_exit);
                self.report_failures(&report);
                Ok(StepStatus::Ran)
            }
            None => Ok(StepStatus::Skipped),
        }
    }

    fn restart_with_exit(&mut self, name: &str, attributes: &StepAttributes) -> StepResult<StepStatus> {
        let plugin = self.resolve_plugin(name)?;
        let config = self.plugin_config(plugin.as_ref(), attributes)?;
        if !config.enabled {
            return Ok(StepStatus::Skipped);
        }

        let mut on_exit = self.exit_reporter();
        let stopped = self.lifecycle.terminate_tracked(name, &mut on_exit);
        if let Some(report) = &stopped {
            self.report_failures(report);
        }

        let command = if plugin.supports_exit_action() {
            plugin.build_exit_command(&config)
        } else {
            None
        };

        // The media-centre mapper outlives the launcher
        match command {
            Some(command) => self.launch(name, &command, config.wait, None, false),
            None if stopped.is_some() => Ok(StepStatus::Ran),
            None => Ok(StepStatus::Skipped),
        }
    }

    fn run_generic(&mut self, step: &str, prefix: &str, attributes: &StepAttributes) -> StepResult<StepStatus> {
        let Some(raw) = attributes.non_empty_attribute(&format!("{}_path", prefix)) else {
            return Ok(StepStatus::Skipped);
        };
        let path = attributes.resolve_path(raw.trim());
        if !path.exists() {
            debug!("{} does not exist, skipping {}", path.display(), step);
            return Ok(StepStatus::Skipped);
        }

        let wait_key = format!("{}_wait", prefix);
        let wait = match attributes.attribute(&wait_key) {
            Some(value) => parse_bool(&value)
                .ok_or_else(|| StepError::invalid_attribute(wait_key.as_str(), value.as_str()))?,
            None => false,
        };
        let options = attributes.attribute(&format!("{}_options", prefix)).unwrap_or_default();
        let arguments = attributes.attribute(&format!("{}_arguments", prefix)).unwrap_or_default();

        info!("Running generic app: {} (wait: {})", path.display(), wait);
        let command = CommandLine::new(path)
            .raw_args(&options)
            .raw_args(&arguments);
        self.launch(step, &command, wait, None, true)
    }

    fn launch(
        &mut self,
        key: &str,
        command: &CommandLine,
        wait: bool,
        cwd: Option<&Path>,
        track: bool,
    ) -> StepResult<StepStatus> {
        self.status.show_message(&format!("  - Executing: {}", command));
        if let Some(handle) = self.runner.run(command, wait, cwd)? {
            if track {
                self.lifecycle.track(key, handle);
            } else {
                debug!("Not tracking '{}' (pid {})", key, handle.pid);
            }
        }
        Ok(StepStatus::Ran)
    }

    /// Start the game and block until it exits
    pub fn run_game(&mut self) -> StepResult<()> {
        let attributes = self.context.config.step_attributes();
        let Some(executable) = &self.game.executable else {
            return Err(StepError::system("launch game", "no game executable configured"));
        };
        let executable = attributes.resolve_path(&executable.to_string_lossy());
        let directory = self.game.directory.as_ref()
            .map(|dir| attributes.resolve_path(&dir.to_string_lossy()));

        self.status.show_message(&format!("Launching game: {}", self.game.name));
        let command = if self.options.run_as_admin && cfg!(windows) {
            info!("Starting {} elevated", self.game.name);
            elevated_command(&executable, directory.as_deref())
        } else {
            if self.options.run_as_admin {
                warn!("run-as-admin is only supported on Windows; starting {} normally", self.game.name);
            }
            CommandLine::new(executable)
        };
        let Some(mut handle) = self.runner.run(&command, false, directory.as_deref())? else {
            return Ok(());
        };

        match handle.wait()? {
            Some(status) if !status.success() => {
                warn!("{} exited with {}", self.game.name, status);
                self.status.show_message(&format!("Game exited with {}", status));
            }
            Some(_) => info!("{} exited", self.game.name),
            None => debug!("Game handle is not owned; not waiting"),
        }
        Ok(())
    }

    /// Mount the configured disc image outside of any sequence
    pub fn mount_disc(&mut self) -> StepResult<bool> {
        let mounted = self.disc.mount(self.runner.as_ref())?;
        if mounted {
            if let Some(image) = self.disc.image() {
                self.status.show_message(&format!("Mounting ISO: {}", image.display()));
            }
        }
        Ok(mounted)
    }

    fn kill_game(&mut self) -> bool {
        let Some(name) = self.game.executable.as_ref()
            .and_then(|exe| exe.file_name())
            .map(|name| name.to_string_lossy().into_owned())
        else {
            debug!("No game executable to kill");
            return false;
        };

        info!("Killing game process: {}", name);
        let mut on_exit = self.exit_reporter();
        let report = self.lifecycle.kill_by_name(&name, &mut on_exit);
        self.report_failures(&report);
        true
    }

    /// Terminate every process named in `kill-list` when `use-kill-list` is on
    pub fn sweep_kill_list(&mut self) -> TerminationReport {
        let mut report = TerminationReport::default();
        if !self.options.use_kill_list {
            return report;
        }

        let mut on_exit = self.exit_reporter();
        for name in &self.options.kill_list {
            self.status.show_message(&format!("Killing process from list: {}", name));
            report.merge(self.lifecycle.kill_by_name(name, &mut on_exit));
        }
        self.report_failures(&report);
        report
    }

    /// Terminate everything still tracked and restore OS toggles this run
    /// flipped. Safe to call any number of times.
    pub fn ensure_cleanup(&mut self) -> TerminationReport {
        if self.lifecycle.tracked_count() > 0 {
            self.status.show_message("Cleaning up background processes...");
        }

        let mut on_exit = self.exit_reporter();
        let report = self.lifecycle.final_cleanup(&mut on_exit);
        self.report_failures(&report);

        if let Some(Err(e)) = self.taskbar.restore(self.runner.as_ref()) {
            self.status.show_error(&format!("Failed to restore taskbar: {}", e));
        }
        if let Err(e) = self.disc.unmount(self.runner.as_ref()) {
            self.status.show_error(&format!("Failed to unmount disc: {}", e));
        }

        report
    }

    /// Configuration problems worth telling the player before launching
    pub fn preflight(&self) -> Vec<ConfigWarning> {
        preflight::check(self.context, &self.actions, &self.invalid_steps)
    }

    fn exit_reporter(&self) -> impl FnMut(u32) + 'static {
        let status = Arc::clone(&self.status);
        move |pid| status.show_message(&format!("  - Process {} terminated.", pid))
    }

    fn report_failures(&self, report: &TerminationReport) {
        for pid in &report.killed {
            self.status.show_message(&format!("  - Process {} did not exit gracefully and was killed.", pid));
        }
        for (pid, e) in &report.failed {
            self.status.show_warning(&format!("  - Could not terminate process {}: {}", pid, e));
        }
    }
}

impl Drop for SequenceExecutor<'_> {
    fn drop(&mut self) {
        self.ensure_cleanup();
    }
}

impl std::fmt::Debug for SequenceExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceExecutor")
            .field("lifecycle", &self.lifecycle)
            .field("taskbar_hidden", &self.taskbar.is_hidden())
            .field("disc_mounted", &self.disc.is_mounted())
            .finish()
    }
}
