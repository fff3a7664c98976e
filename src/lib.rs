pub mod app;
pub mod backup;
pub mod cli;
pub mod config;
pub mod instance;
pub mod logging;
pub mod plugin;
pub mod process;
pub mod sequence;
pub mod status;
