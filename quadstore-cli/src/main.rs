//! Bootstrap, inspect and tear down a `quadstore` environment (spec §6.4).
//! A thin binary: the REPL/session/server machinery of the teacher's
//! `kv-cli` has no counterpart here — this crate exists only to seed and
//! inspect a store file for the LDP layer's own test harnesses.

mod command;
mod config;
mod trace;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::error;

use command::Command;
use config::ConfigLoad;

#[derive(Debug, Parser)]
#[command(author, version, about = "Bootstrap, inspect and tear down a quadstore environment")]
struct Args {
    #[clap(long, default_value = "info")]
    log_level: String,

    #[clap(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = trace::init_logging(&args.log_level) {
        eprintln!("failed to initialize logging: {err}");
    }

    match run(args) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(args: Args) -> Result<i32> {
    let cfg = ConfigLoad::load();
    command::run(args.command, &cfg)
}
