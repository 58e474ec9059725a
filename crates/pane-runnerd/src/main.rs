use std::thread;

use anyhow::{Context, anyhow};
use clap::Parser;
use tracing::{error, info};

use pane_core::runner::panic_message;
use pane_observe::init_file_logger;

mod app;
mod cli;
mod exit_codes;
mod settings;

use cli::Cli;
use settings::RunnerSettings;

/// Stack of the thread the invocation runs on. Interpreter recursion is bounded
/// by call depth times syntactic nesting; the default limits fit well inside.
const INVOCATION_STACK_SIZE: usize = 256 * 1024 * 1024;

fn main() {
    let settings = RunnerSettings::from(Cli::parse());

    let code = match run(&settings) {
        Ok(code) => code,
        Err(e) => {
            error!("runner failed: {e:#}");
            eprintln!("pane-runnerd: {e:#}");
            exit_codes::HARNESS_FAULT
        }
    };
    info!(code, "runner exiting");
    std::process::exit(code);
}

fn run(settings: &RunnerSettings) -> anyhow::Result<i32> {
    // 1) logger, once the output dir exists
    std::fs::create_dir_all(&settings.out_dir)?;
    init_file_logger(&settings.logger, &settings.log_path())?;
    info!(version = env!("CARGO_PKG_VERSION"), "logger initialized");

    // 2) the invocation itself, on a thread with room for deep scripts
    let settings = settings.clone();
    thread::Builder::new()
        .name("invocation".into())
        .stack_size(INVOCATION_STACK_SIZE)
        .spawn(move || app::execute(&settings))
        .context("spawning invocation thread")?
        .join()
        .map_err(|panic| anyhow!("invocation panicked: {}", panic_message(panic.as_ref())))?
}
