mod app;
mod cli;
mod config;
mod domain;
mod infra;
mod ui;
mod util;

use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use crate::{app::App, cli::Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match App::new(&cli) {
        Ok(app) => app.run(cli.command).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}
