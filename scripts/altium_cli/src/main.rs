use std::process::ExitCode;

use altium_cli::{execute, Cli};
use altium_registry::WindowsRegistry;
use clap::Parser;

pub fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match execute(cli, WindowsRegistry::default()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
