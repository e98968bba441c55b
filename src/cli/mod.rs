//! CLI module for geoalert
//!
//! Provides command-line interface for:
//! - run: long-lived sweep service
//! - sweep: one sweep, summary on stdout
//! - subscribe / unsubscribe / list: subscriber management

mod args;
mod commands;
mod config;
mod errors;
mod io;
mod signals;

pub use args::{Cli, Command};
pub use commands::{list, run, run_command, serve, subscribe, sweep, unsubscribe};
pub use config::{
    Config, HAZARD_URL_ENV, SMTP_HOST_ENV, SMTP_PASSWORD_ENV, SMTP_PORT_ENV, SMTP_USER_ENV,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
pub use signals::wait_for_shutdown_signal;
