//! Command-line front end for the Quod Libet query language.
//!
//! Reads JSON-lines records and prints those matching a query, classifies
//! query strings, and checks the built-in diacritic table against the
//! running Unicode data.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;

use ql_query::cli::{Cli, run};
use ql_query::config::CliConfig;
use ql_query::logging::init_logging;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            init_logging(&CliConfig::default());
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::from(2);
        }
    };
    init_logging(&config);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), ?config, "starting ql-query");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run(&cli.command, &config, &mut out) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            let _ = out.flush();
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
