//! Application-level orchestration utilities.
//!
//! This module owns the exam session lifecycle (start/end/poll) and post-session processing
//! such as auto-save and exports. UI/CLI layers call into this module to keep
//! responsibilities separated.

mod controller;
mod poller;
mod post_process;

pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use post_process::process_session_end;
