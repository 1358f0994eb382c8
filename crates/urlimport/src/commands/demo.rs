//! Demo Command
//!
//! Import `remotePack` from a local development server and call its `fun()`.
//! Serve a directory containing `remotePack.py` with any static file server
//! on port 8000 to try it.

use crate::commands::run::run_module;
use crate::context::CliContext;
use starbase::AppResult;

pub const DEMO_ROOT: &str = "http://localhost:8000";
pub const DEMO_MODULE: &str = "remotePack";
pub const DEMO_FUNCTION: &str = "fun";

/// Run the demo command.
pub fn run_demo(ctx: &CliContext) -> AppResult {
    run_module(ctx, DEMO_ROOT, DEMO_MODULE, Some(DEMO_FUNCTION), &[])
}
