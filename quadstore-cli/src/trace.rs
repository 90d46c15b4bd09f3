//! Logging setup, following `kv-cli`'s `fern`-based dispatcher (`trace.rs`)
//! but trimmed to a single stderr sink — the CLI is a short-lived
//! bootstrap/inspect tool, not a long-running server with rolling log files.

use std::str::FromStr;

use log::LevelFilter;

pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);

    let result = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{} {}] {}", record.level(), record.target(), message))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply();

    if result.is_err() {
        eprintln!("logger has already been set");
    }
    Ok(())
}
