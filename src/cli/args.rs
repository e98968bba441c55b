//! CLI argument definitions using clap
//!
//! Commands:
//! - geoalert run --config <path> [--interval-secs N] [--workers N] [--dry-run]
//! - geoalert sweep --config <path> [--dry-run]
//! - geoalert subscribe --config <path> --email E --x X --y Y
//! - geoalert unsubscribe --config <path> --email E
//! - geoalert list --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// geoalert - email alerts for subscribers whose location turns hazardous
#[derive(Parser, Debug)]
#[command(name = "geoalert")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run sweeps on a fixed interval until SIGINT/SIGTERM/SIGQUIT
    Run {
        /// Path to configuration file
        #[arg(long, env = "GEOALERT_CONFIG", default_value = "./geoalert.json")]
        config: PathBuf,

        /// Override sweep.interval_secs
        #[arg(long)]
        interval_secs: Option<u64>,

        /// Override sweep.workers
        #[arg(long)]
        workers: Option<usize>,

        /// Record alerts in memory instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a single sweep, print its summary and exit
    Sweep {
        /// Path to configuration file
        #[arg(long, env = "GEOALERT_CONFIG", default_value = "./geoalert.json")]
        config: PathBuf,

        /// Record alerts in memory instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Register a subscriber
    Subscribe {
        /// Path to configuration file
        #[arg(long, env = "GEOALERT_CONFIG", default_value = "./geoalert.json")]
        config: PathBuf,

        /// Subscriber email address
        #[arg(long)]
        email: String,

        /// First coordinate
        #[arg(long, allow_negative_numbers = true)]
        x: f64,

        /// Second coordinate
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
    },

    /// Remove a subscriber
    Unsubscribe {
        /// Path to configuration file
        #[arg(long, env = "GEOALERT_CONFIG", default_value = "./geoalert.json")]
        config: PathBuf,

        /// Subscriber email address
        #[arg(long)]
        email: String,
    },

    /// Print all subscribers
    List {
        /// Path to configuration file
        #[arg(long, env = "GEOALERT_CONFIG", default_value = "./geoalert.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
