//! Command line interface for the release driver.

mod args;
mod output;

pub use args::Args;
pub use output::{OutputManager, render_banner};

use crate::config::ReleaseConfig;
use crate::error::Result;
use crate::orchestrator::ReleaseOrchestrator;
use crate::runner::SystemRunner;
use crate::signal::SignalBridge;
use anyhow::Context;
use clap::Parser;
use std::ffi::OsString;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    run_with(std::env::args_os()).await
}

/// Run with an explicit argument vector (first element is the program name)
pub async fn run_with<I, T>(argv: I) -> Result<i32>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match Args::try_parse_from(argv) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return Ok(1);
        }
    };

    if args.help {
        println!("{}", Args::help_text());
        return Ok(1);
    }

    let Some(target_version) = args.target_version.clone() else {
        eprintln!("error: missing required argument VERSION\n");
        eprintln!("{}", Args::usage_text());
        return Ok(1);
    };

    if args.no_revert && !args.dry_run {
        log::warn!("--no-revert only has an effect together with --dry-run");
    }

    let project_root = std::fs::canonicalize(&args.project_dir).with_context(|| {
        format!("project directory '{}' not found", args.project_dir.display())
    })?;
    let config = ReleaseConfig::load(&args.config_path(&project_root))?;
    let options = args.release_options(&target_version, &config);

    let signals = SignalBridge::install()?;
    let runner = SystemRunner::new(&project_root);
    let output = OutputManager::new(args.quiet);

    let orchestrator = ReleaseOrchestrator::new(&runner, &config, &project_root, &signals, output);
    orchestrator.run(options).await?;
    Ok(0)
}
