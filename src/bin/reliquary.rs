//! Reliquary CLI Binary
//!
//! Exit codes: 0 success, 1 fatal error, 2 the command ran but its report
//! found problems, such as a failed audit.

use clap::Parser;
use reliquary::logging::init_logging;
use reliquary::tooling::cli::{Cli, CliContext};
use std::process;

fn main() {
    let cli = Cli::parse();

    let context = match CliContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let logging = context.logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging)) {
        eprintln!("Error initializing logging: {}", e);
        process::exit(1);
    }

    match context.execute_report(&cli.command) {
        Ok(outcome) => {
            println!("{}", outcome.output);
            if !outcome.clean {
                process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
