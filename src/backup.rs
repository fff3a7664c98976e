//! Save directory backups taken before the game starts
//!
//! The save directory is zipped into `SaveBackup_<timestamp>.zip` under the
//! backup directory, then the oldest archives beyond `max-backups` are
//! removed. Timestamps sort lexically, so file name order is age order.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};
use crate::config::ConfigManager;
use crate::plugin::config::AttributeSource;

const ARCHIVE_PREFIX: &str = "SaveBackup_";
const ARCHIVE_SUFFIX: &str = ".zip";
const SAVES_DIR: &str = "Saves";
const BACKUPS_DIR: &str = "Backups";

#[derive(Debug, Clone, PartialEq)]
pub struct SaveBackup {
    save_dir: PathBuf,
    backup_dir: PathBuf,
    max_backups: usize,
}

/// Result of one backup run
#[derive(Debug, Default)]
pub struct BackupOutcome {
    pub archive: PathBuf,
    /// Old archives deleted by rotation, oldest first
    pub removed: Vec<PathBuf>,
}

impl SaveBackup {
    /// At least one archive, the one just written, is always kept
    pub fn new(save_dir: PathBuf, backup_dir: PathBuf, max_backups: usize) -> Self {
        Self {
            save_dir,
            backup_dir,
            max_backups: max_backups.max(1),
        }
    }

    /// `None` when `backup-saves` is off or no profile directory is known.
    ///
    /// `save-dir` and `backup-dir` default to `Saves` and `Backups` next to
    /// the configuration file.
    pub fn from_config(config: &ConfigManager) -> Result<Option<Self>> {
        let options = config.launcher_options()?;
        if !options.backup_saves {
            return Ok(None);
        }

        let attributes = config.step_attributes();
        let resolve = |path: PathBuf| attributes.resolve_path(&path.to_string_lossy());
        let profile = config.profile_dir();
        let save_dir = options.save_dir.map(&resolve)
            .or_else(|| profile.as_ref().map(|dir| dir.join(SAVES_DIR)));
        let backup_dir = options.backup_dir.map(&resolve)
            .or_else(|| profile.as_ref().map(|dir| dir.join(BACKUPS_DIR)));

        match (save_dir, backup_dir) {
            (Some(save_dir), Some(backup_dir)) => Ok(Some(Self::new(save_dir, backup_dir, options.max_backups))),
            _ => {
                warn!("backup-saves is on but no save or backup directory could be determined");
                Ok(None)
            }
        }
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Archive the save directory and rotate old archives.
    /// Returns `None` when there is no save directory to back up.
    pub fn run(&self) -> Result<Option<BackupOutcome>> {
        if !self.save_dir.is_dir() {
            debug!("Save directory {} not found", self.save_dir.display());
            return Ok(None);
        }

        fs::create_dir_all(&self.backup_dir)
            .with_context(|| format!("Failed to create backup directory: {}", self.backup_dir.display()))?;

        let name = format!("{}{}{}", ARCHIVE_PREFIX, Local::now().format("%Y-%m-%d_%H-%M-%S"), ARCHIVE_SUFFIX);
        let archive = self.backup_dir.join(name);
        self.write_archive(&archive)
            .with_context(|| format!("Failed to write {}", archive.display()))?;
        info!("Backed up {} to {}", self.save_dir.display(), archive.display());

        let removed = self.rotate()?;
        Ok(Some(BackupOutcome { archive, removed }))
    }

    fn write_archive(&self, archive: &Path) -> Result<()> {
        let mut writer = ZipWriter::new(File::create(archive)?);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let walker = WalkDir::new(&self.save_dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !entry.path().starts_with(&self.backup_dir));

        for entry in walker {
            let entry = entry?;
            let relative = entry.path().strip_prefix(&self.save_dir)?;
            let name = relative.components()
                .map(|part| part.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if entry.file_type().is_dir() {
                writer.add_directory(name, options)?;
            } else if entry.file_type().is_file() {
                writer.start_file(name, options)?;
                let mut source = File::open(entry.path())?;
                io::copy(&mut source, &mut writer)?;
            }
        }

        writer.finish()?;
        Ok(())
    }

    /// Delete the oldest archives beyond the limit
    fn rotate(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.backup_dir)
            .with_context(|| format!("Failed to list {}", self.backup_dir.display()))?;
        let mut archives: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.file_name()
                .and_then(|name| name.to_str())
                .map(is_archive_name)
                .unwrap_or(false))
            .collect();
        archives.sort();

        let excess = archives.len().saturating_sub(self.max_backups);
        let removed: Vec<PathBuf> = archives.into_iter().take(excess).collect();
        for path in &removed {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove old backup: {}", path.display()))?;
            debug!("Removed old backup {}", path.display());
        }
        Ok(removed)
    }
}

fn is_archive_name(name: &str) -> bool {
    name.starts_with(ARCHIVE_PREFIX) && name.ends_with(ARCHIVE_SUFFIX)
}
