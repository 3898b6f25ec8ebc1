//! shipline - build and deploy a service through a fixed stage pipeline
//!
//! ## Usage
//!
//! ```bash
//! # Build and run the service locally, then wait for it to become healthy
//! shipline --stage all --local
//!
//! # Stop after the frontend build
//! shipline --stage frontend-build
//!
//! # Build everything and run the remote deploy script
//! shipline --stage aws-deploy --monitor
//! ```
//!
//! Exits 0 when every planned stage succeeded and 1 otherwise.

use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    match cli::run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
