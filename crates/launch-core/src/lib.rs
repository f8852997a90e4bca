//! Prepares a per-user scratch area and runs an interpreter under a profiler.
//!
//! Sequence: resolve the launcher directory, ensure `<scratch-root>/<user>`
//! exists, link `~/scratch` to it when nothing is there yet, switch into it,
//! then start `<profiler> <interpreter> --project=<dir> --color=yes <args..>`.

pub mod bootstrap;
pub mod command;
pub mod config;
mod error;
pub mod launch;

pub use bootstrap::{
    Bootstrapper, SymlinkOutcome, ensure_home_symlink, ensure_scratch_directory,
    resolve_self_directory, select_working_directory, self_directory_of,
};
pub use command::LaunchCommand;
pub use config::{DEFAULT_WORKDIR_POLICY, LaunchMode, LauncherConfig, WorkdirPolicy};
pub use error::{
    LaunchError, NOT_EXECUTABLE_EXIT_CODE, NOT_FOUND_EXIT_CODE, SETUP_FAILURE_EXIT_CODE,
};
pub use launch::{LaunchPlan, exit_code_of, launch};
