//! `release` - transactional release driver.
//!
//! Prepares a release locally (branch, version rewrite, build, archive, commit,
//! tag), rolls all of it back on failure, then pushes and publishes.

use release_pilot::cli;
use release_pilot::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    env_logger::init();

    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            // Never quiet for the final error
            let output = OutputManager::new(false);
            output.error(&format!("{e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    output.indent(&suggestion);
                }
            }

            process::exit(1);
        }
    }
}
