//! geoalert CLI entry point
//!
//! Parses arguments and dispatches via `cli::run`, prints errors to
//! stderr and exits non-zero on failure. Configuration, subsystems and
//! the async runtime all live behind `cli::run`.

use geoalert::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
