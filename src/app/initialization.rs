//! Application initialization and configuration

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use log::{debug, info, warn, LevelFilter};
use crate::{cli, config, instance, logging};
use crate::process::ProcessTable;
use crate::sequence::LauncherContext;

pub fn load_configuration(args: &cli::Args) -> Result<config::ConfigManager> {
    let mut manager = config::ConfigManager::load(args.config_file.as_deref())?;

    if let Some(profile) = &args.profile {
        debug!("Selecting configuration profile: {}", profile);
        manager.select_section(profile.trim().to_string());
    }

    Ok(manager)
}

pub fn configure_logging(args: &cli::Args, config: &config::ConfigManager) -> Result<logging::LogConfig> {
    let console_level = if args.debug {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        match config.get_log_level("base", "console-level") {
            Ok(Some(level)) => level,
            Ok(None) => LevelFilter::Info,
            Err(e) => {
                eprintln!("Ignoring base.console-level: {:#}", e);
                LevelFilter::Info
            }
        }
    };

    let format = if !args.log_format.is_empty() && !args.log_format.eq_ignore_ascii_case("text") {
        logging::LogFormat::from_str(&args.log_format)
            .map_err(|e| anyhow::anyhow!(e))?
    } else {
        config.get_value("base", "log-format")
            .and_then(|value| logging::LogFormat::from_str(value).ok())
            .unwrap_or(logging::LogFormat::Text)
    };

    let log_file_path = args.log_file.clone()
        .or_else(|| config.get_path("base", "log-file"));

    let file_log_level = match &args.log_file_level {
        Some(level_str) => Some(logging::parse_log_level(level_str)?),
        None => config.get_log_level("base", "file-log-level").unwrap_or(None),
    };

    let (destination, file_level) = match (log_file_path, file_log_level) {
        (Some(path), level) => (logging::LogDestination::Both(path), Some(level.unwrap_or(console_level))),
        (None, None) => (logging::LogDestination::Console, None),
        (None, Some(_)) => {
            return Err(anyhow::anyhow!("Log file level specified without log file"));
        }
    };

    Ok(logging::LogConfig {
        console_level,
        file_level,
        format,
        destination,
    })
}

/// Claim the single-instance marker unless another live launcher holds it
pub fn acquire_instance(options: &config::LauncherOptions, table: &dyn ProcessTable) -> Result<Option<instance::InstanceGuard>> {
    let Some(path) = instance::default_marker_path() else {
        warn!("No data directory for the instance marker; skipping the single-instance check");
        return Ok(None);
    };

    match instance::InstanceGuard::acquire(&path, options.multi_instance, table) {
        Ok(guard) => Ok(Some(guard)),
        Err(e) if e.is_conflict() => Err(anyhow::Error::new(e)),
        Err(e) => {
            warn!("Continuing without instance marker: {}", e);
            Ok(None)
        }
    }
}

/// Command line beats the `[options]` section for tool and plugin directories
pub fn resolve_directories(args: &cli::Args, options: &config::LauncherOptions) -> (Option<PathBuf>, Option<PathBuf>) {
    let bin_root = args.bin_root.clone().or_else(|| options.bin_root.clone());
    let plugin_dir = args.plugin_dir.clone().or_else(|| options.plugin_dir.clone());
    (bin_root, plugin_dir)
}

/// Registry with built-ins, descriptor plugins and the installed-tool scan
pub fn create_launcher_context(args: &cli::Args, config: config::ConfigManager) -> Result<LauncherContext> {
    let options = config.launcher_options()
        .context("Invalid [options] section")?;
    let (bin_root, plugin_dir) = resolve_directories(args, &options);

    let mut context = LauncherContext::new(config);
    debug!("Registered {} built-in capabilities", context.registry.count());

    if let Some(dir) = plugin_dir {
        if dir.is_dir() {
            let report = if options.recursive_plugins {
                context.load_plugins_recursive(&dir)
            } else {
                context.load_plugins(&dir)
            };
            info!("Plugin directory {}: {} loaded, {} failed", dir.display(), report.loaded.len(), report.errors.len());
        } else {
            warn!("Plugin directory {} does not exist", dir.display());
        }
    }

    let found = context.scan_tools(bin_root);
    debug!("Found installed tools for {} capabilities", found);

    Ok(context)
}
