//! Release session and phase tracking.
//!
//! The session is created once from validated input and then only its phase
//! moves, strictly forward. Cleanup is derived from the highest phase reached.

mod release_state;

pub use release_state::{
    CleanupAction, Phase, ReleaseSession, SessionOptions, TerminalState, release_branch_name,
    release_tag_name,
};
