use anyhow::Result;
use std::process;
use std::sync::Arc;
use log::error;
use gamewrap::status::{ConsoleStatus, StatusSink};
use gamewrap::{app, cli, logging};

fn main() {
    if let Err(e) = run() {
        error!("Launcher failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = cli::parse_args();
    cli::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;

    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;

    if args.list_plugins {
        return app::handle_list_plugins(&args, config_manager);
    }
    if args.scan_tools {
        return app::handle_scan_tools(&args, config_manager);
    }

    let status: Arc<dyn StatusSink> = if args.no_color {
        Arc::new(ConsoleStatus::with_colours(false))
    } else {
        Arc::new(ConsoleStatus::new())
    };

    if args.check {
        return app::handle_check(&args, config_manager, status);
    }

    app::run_launcher(&args, config_manager, status)
}
