mod app;
mod args;
mod config;
mod domain;
mod entry;
mod error;
mod metrics;
mod probe;
mod run;
mod stream;
mod system;

use std::process::ExitCode;

fn main() -> ExitCode {
    match entry::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
