mod branch;
mod cli;
mod config;
mod credential;
mod http;
mod model;
mod provider;

use std::process::ExitCode;

use cli::Cli;

fn main() -> ExitCode {
    Cli::init(module_path!())
}
