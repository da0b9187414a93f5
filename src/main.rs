//! reeldb CLI entry point
//!
//! Installs logging, delegates to `cli::run`, prints the error to stderr and
//! exits with status 1 on failure.

use reeldb::{cli, observability};

fn main() {
    observability::init_logging();
    if let Err(e) = cli::run() {
        eprintln!("error[{}]: {}", e.code(), e);
        std::process::exit(1);
    }
}
