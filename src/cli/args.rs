use clap::Parser;
use anyhow::Result;
use std::path::PathBuf;
use log::debug;

/// Game launch wrapper
#[derive(Parser, Debug)]
#[command(name = "gamewrap")]
#[command(about = "Runs a game's companion tools in a configured order, launches the game, then restores everything when it exits")]
#[command(version)]
pub struct Args {
    /// Configuration file (otherwise discovered: $GAMEWRAP_CONFIG, ./Game.toml, user config dir)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Configuration profile overlaying the base sections, e.g. "deck"
    #[arg(short = 'p', long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Directory scanned for installed tool executables
    #[arg(long, value_name = "DIR")]
    pub bin_root: Option<PathBuf>,

    /// Directory of plugin descriptor files to load
    #[arg(long, value_name = "DIR")]
    pub plugin_dir: Option<PathBuf>,

    /// Check the configuration and report problems without launching anything
    #[arg(long)]
    pub check: bool,

    /// List registered capabilities and exit
    #[arg(long)]
    pub list_plugins: bool,

    /// Scan the bin root, report installed tools and exit
    #[arg(long)]
    pub scan_tools: bool,

    /// Verbose output (debug level logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long)]
    pub debug: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log file path for file output
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL")]
    pub log_file_level: Option<String>,

    /// Disable coloured status output
    #[arg(long)]
    pub no_color: bool,
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    let args = Args::parse();
    debug!("Parsed CLI arguments: {:?}", args);
    args
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    let log_flags_count = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();

    if log_flags_count > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be specified"
        ));
    }

    match args.log_format.to_lowercase().as_str() {
        "text" | "json" => {},
        _ => return Err(anyhow::anyhow!(
            "Invalid log format '{}'. Valid options: text, json", args.log_format
        )),
    }

    if let Some(ref level) = args.log_file_level {
        match level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {},
            _ => return Err(anyhow::anyhow!(
                "Invalid log file level '{}'. Valid levels: error, warn, info, debug, trace", level
            )),
        }
    }

    if args.log_file_level.is_some() && args.log_file.is_none() {
        return Err(anyhow::anyhow!(
            "--log-file-level requires --log-file to be specified"
        ));
    }

    let modes = [args.check, args.list_plugins, args.scan_tools]
        .iter()
        .filter(|&&flag| flag)
        .count();
    if modes > 1 {
        return Err(anyhow::anyhow!(
            "Only one of --check, --list-plugins or --scan-tools may be specified"
        ));
    }

    if let Some(profile) = &args.profile {
        if profile.trim().is_empty() {
            return Err(anyhow::anyhow!("--profile needs a section name"));
        }
    }

    Ok(())
}
