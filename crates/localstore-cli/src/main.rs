use std::process::ExitCode;

use clap::Parser as _;
use command::{item::KeyNotFound, Cli};

use crate::logger::LoggerConfig;

mod command;
mod config;
mod logger;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    logger::init_logger(LoggerConfig { format: cli.global.log_format });

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is::<KeyNotFound>() => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
