use std::{
    ffi::OsString,
    io::{self, ErrorKind},
    path::PathBuf,
};

use thiserror::Error;

/// Exit status used for every failure that happens before the child starts.
pub const SETUP_FAILURE_EXIT_CODE: i32 = 1;
/// Shell convention for a program that cannot be found.
pub const NOT_FOUND_EXIT_CODE: i32 = 127;
/// Shell convention for a program that exists but cannot be executed.
pub const NOT_EXECUTABLE_EXIT_CODE: i32 = 126;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("missing environment variable {name}")]
    MissingEnv { name: &'static str },
    #[error("invalid user identifier {user:?}")]
    InvalidUser { user: String },
    #[error("{name} must be an absolute path, got {path:?}")]
    RelativePath { name: &'static str, path: PathBuf },
    #[error("failed to resolve launcher directory from {path:?}")]
    ResolveSelf {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("launcher executable {path:?} has no parent directory")]
    NoParent { path: PathBuf },
    #[error("failed to create scratch directory {path:?}")]
    ScratchDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to inspect {path:?}")]
    InspectLink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to link {link:?} to {target:?}")]
    HomeSymlink {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to change working directory to {path:?}")]
    WorkingDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to start {program:?}")]
    Spawn {
        program: OsString,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Process exit status the launcher should terminate with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::Spawn { source, .. } => match source.kind() {
                ErrorKind::NotFound => NOT_FOUND_EXIT_CODE,
                ErrorKind::PermissionDenied => NOT_EXECUTABLE_EXIT_CODE,
                _ => SETUP_FAILURE_EXIT_CODE,
            },
            _ => SETUP_FAILURE_EXIT_CODE,
        }
    }

    /// True when the failure happened while preparing the environment, before
    /// any attempt to start the profiler.
    pub fn is_setup_failure(&self) -> bool {
        !matches!(self, LaunchError::Spawn { .. })
    }
}
