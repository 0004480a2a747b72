//! Git workflow for release runs.
//!
//! All repository access goes through the `git` CLI via a
//! [`CommandRunner`](crate::runner::CommandRunner), so scenario tests can
//! script every answer without a real repository.

mod manager;

pub use manager::GitWorkflowManager;
