//! OS-global toggles flipped by system actions
//!
//! Taskbar visibility and disc images are changed through configured shell
//! commands. Each toggle remembers whether it was flipped so final cleanup
//! can restore exactly what this run changed.

use std::path::{Path, PathBuf};
use std::time::Duration;
use log::{debug, info};
use crate::config::{GameInfo, LauncherOptions};
use crate::plugin::command::{split_args, CommandLine};
use crate::process::CommandRunner;
use super::error::{StepError, StepResult};

const IMAGE_PLACEHOLDER: &str = "{image}";
const MOUNT_SETTLE_TIME: Duration = Duration::from_secs(2);

/// Turn configured command text into a command line, substituting `{image}`
pub fn command_from_text(text: &str, image: Option<&Path>) -> Option<CommandLine> {
    let image = image.map(|path| path.to_string_lossy().into_owned()).unwrap_or_default();
    let mut words = split_args(text)
        .into_iter()
        .map(|word| word.replace(IMAGE_PLACEHOLDER, &image));
    let program = words.next()?;
    Some(CommandLine::new(program).args(words))
}

/// PowerShell wrapper that starts `executable` elevated and waits for it
pub fn elevated_command(executable: &Path, directory: Option<&Path>) -> CommandLine {
    let quote = |path: &Path| format!("'{}'", path.to_string_lossy().replace('\'', "''"));
    let mut script = format!("Start-Process -FilePath {} -Verb RunAs -Wait", quote(executable));
    if let Some(dir) = directory {
        script.push_str(&format!(" -WorkingDirectory {}", quote(dir)));
    }
    CommandLine::new("powershell")
        .args(["-NoProfile", "-Command"])
        .arg(script)
}

fn run_waited(runner: &dyn CommandRunner, action: &str, command: &CommandLine) -> StepResult<()> {
    runner.run(command, true, None)
        .map(|_| ())
        .map_err(|e| StepError::system(action, e.to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct TaskbarControl {
    hide_command: Option<String>,
    show_command: Option<String>,
    enabled: bool,
    hidden: bool,
}

impl TaskbarControl {
    pub fn new(enabled: bool, hide_command: Option<String>, show_command: Option<String>) -> Self {
        Self { hide_command, show_command, enabled, hidden: false }
    }

    pub fn from_options(options: &LauncherOptions) -> Self {
        Self::new(
            options.hide_taskbar,
            options.taskbar_hide_command.clone(),
            options.taskbar_show_command.clone(),
        )
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Hide the taskbar when `hide-taskbar` is on. Returns whether it was hidden.
    pub fn hide(&mut self, runner: &dyn CommandRunner) -> StepResult<bool> {
        if !self.enabled {
            debug!("hide-taskbar is off");
            return Ok(false);
        }
        let Some(command) = self.hide_command.as_deref().and_then(|text| command_from_text(text, None)) else {
            debug!("No taskbar-hide-command configured");
            return Ok(false);
        };

        info!("Hiding taskbar");
        run_waited(runner, "hide taskbar", &command)?;
        self.hidden = true;
        Ok(true)
    }

    /// Show the taskbar. Returns whether a command ran.
    pub fn show(&mut self, runner: &dyn CommandRunner) -> StepResult<bool> {
        let Some(command) = self.show_command.as_deref().and_then(|text| command_from_text(text, None)) else {
            debug!("No taskbar-show-command configured");
            self.hidden = false;
            return Ok(false);
        };

        info!("Showing taskbar");
        run_waited(runner, "show taskbar", &command)?;
        self.hidden = false;
        Ok(true)
    }

    /// Show the taskbar again if this run hid it; a single attempt
    pub fn restore(&mut self, runner: &dyn CommandRunner) -> Option<StepResult<bool>> {
        if !self.hidden {
            return None;
        }
        let result = self.show(runner);
        self.hidden = false;
        Some(result)
    }
}

fn default_mount_command() -> Option<String> {
    if cfg!(windows) {
        Some(r#"powershell -NoProfile -Command "Mount-DiskImage -ImagePath '{image}'""#.to_string())
    } else if cfg!(target_os = "macos") {
        Some(r#"hdiutil mount "{image}""#.to_string())
    } else if cfg!(target_os = "linux") {
        Some(r#"udisksctl loop-setup -f "{image}""#.to_string())
    } else {
        None
    }
}

fn default_unmount_command() -> Option<String> {
    if cfg!(windows) {
        Some(r#"powershell -NoProfile -Command "Dismount-DiskImage -ImagePath '{image}'""#.to_string())
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct DiscMount {
    image: Option<PathBuf>,
    mount_command: Option<String>,
    unmount_command: Option<String>,
    settle_time: Duration,
    mounted: bool,
}

impl DiscMount {
    pub fn new(image: Option<PathBuf>, mount_command: Option<String>, unmount_command: Option<String>) -> Self {
        Self {
            image,
            mount_command,
            unmount_command,
            settle_time: MOUNT_SETTLE_TIME,
            mounted: false,
        }
    }

    /// Configured commands, or the platform's own disk image tools
    pub fn from_config(game: &GameInfo, options: &LauncherOptions) -> Self {
        Self::new(
            game.iso_path.clone(),
            options.mount_command.clone().or_else(default_mount_command),
            options.unmount_command.clone().or_else(default_unmount_command),
        )
    }

    /// Time given to the OS after mounting before the game needs the drive
    pub fn with_settle_time(mut self, settle_time: Duration) -> Self {
        self.settle_time = settle_time;
        self
    }

    pub fn image(&self) -> Option<&Path> {
        self.image.as_deref()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Mount the image if one is configured and exists. Returns whether it mounted.
    pub fn mount(&mut self, runner: &dyn CommandRunner) -> StepResult<bool> {
        if self.mounted {
            debug!("Disc image already mounted");
            return Ok(false);
        }
        let Some(image) = self.image.as_deref().filter(|path| path.exists()) else {
            debug!("No disc image to mount");
            return Ok(false);
        };
        let Some(command) = self.mount_command.as_deref().and_then(|text| command_from_text(text, Some(image))) else {
            return Err(StepError::system("mount disc", "no mount-command configured for this platform"));
        };

        info!("Mounting disc image {}", image.display());
        run_waited(runner, "mount disc", &command)?;
        self.mounted = true;
        if !self.settle_time.is_zero() {
            std::thread::sleep(self.settle_time);
        }
        Ok(true)
    }

    /// Unmount an image this run mounted. Returns whether a command ran.
    pub fn unmount(&mut self, runner: &dyn CommandRunner) -> StepResult<bool> {
        if !self.mounted {
            return Ok(false);
        }
        self.mounted = false;

        let image = self.image.as_deref();
        let Some(command) = self.unmount_command.as_deref().and_then(|text| command_from_text(text, image)) else {
            debug!("No unmount-command configured; leaving image attached");
            return Ok(false);
        };

        info!("Unmounting disc image");
        run_waited(runner, "unmount disc", &command)?;
        Ok(true)
    }
}
