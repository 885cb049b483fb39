pub mod config;
pub mod detect;
pub mod merge;
pub mod pattern;
pub mod status;
pub mod vision;

use learnloop_core::config::Config;
use std::path::PathBuf;

/// Resolved invocation settings shared by every subcommand.
pub struct Context {
    pub root: PathBuf,
    pub config: Config,
    pub store: PathBuf,
    pub json: bool,
}
