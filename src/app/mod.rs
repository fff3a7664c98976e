//! Application orchestration module

pub mod initialization;
pub mod execution;

pub use initialization::{
    acquire_instance,
    configure_logging,
    create_launcher_context,
    load_configuration,
};
pub use execution::{
    handle_check,
    handle_list_plugins,
    handle_scan_tools,
    run_launcher,
};
