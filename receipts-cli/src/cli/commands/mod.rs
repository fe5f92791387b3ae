//! Command handlers

pub mod config;
pub mod process;

pub use config::handle_config_command;
pub use process::handle_process_command;
