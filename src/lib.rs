//! # Release Pilot
//!
//! Transactional release automation for a versioned project.
//!
//! A release is a sequence of local, reversible steps followed by an
//! irreversible publication step:
//!
//! - **Reversible**: create `releasing-<version>`, rewrite the version string,
//!   clean/test/build, copy schema files, archive, commit, tag `v<version>`.
//!   Any failure or termination signal here restores the original branch and
//!   working tree.
//! - **Irreversible**: push the branch and tags, rsync the release directory.
//!   A failure here is never rolled back; it is escalated with a banner.
//!
//! ## Usage
//!
//! ```bash
//! release 1.1                  # full release
//! release -t 1.1               # run tests first
//! release -n 1.1               # dry run, repository restored afterwards
//! release -n -r 1.1            # dry run, keep branch and tag for inspection
//! ```
//!
//! All external tools are reached through [`runner::CommandRunner`], so the
//! whole workflow can be driven by [`runner::ScriptedRunner`] in tests.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod orchestrator;
pub mod publish;
pub mod runner;
pub mod signal;
pub mod state;
pub mod version;

pub use config::ReleaseConfig;
pub use error::{ReleaseError, Result, ValidationError};
pub use orchestrator::{ReleaseOptions, ReleaseOrchestrator, ReleaseReport};
pub use runner::{CommandResult, CommandRunner, CommandSpec, SystemRunner};
pub use signal::SignalBridge;
pub use state::{CleanupAction, Phase, ReleaseSession, TerminalState};
