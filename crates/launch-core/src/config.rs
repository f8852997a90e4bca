//! Launcher configuration.
//!
//! The ambient environment (user, home, scratch root, tool overrides) is read
//! exactly once into a `LauncherConfig`; everything downstream takes the
//! struct and never consults `std::env` again.

use std::{
    env,
    ffi::{OsStr, OsString},
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
};

use crate::error::LaunchError;

pub const ENV_USER: &str = "USER";
pub const ENV_LOGNAME: &str = "LOGNAME";
pub const ENV_HOME: &str = "HOME";
pub const ENV_SCRATCH_ROOT: &str = "SCRATCH";
pub const ENV_PROFILER: &str = "SCRATCH_LAUNCH_PROFILER";
pub const ENV_PROFILER_ARGS: &str = "SCRATCH_LAUNCH_PROFILER_ARGS";
pub const ENV_INTERPRETER: &str = "SCRATCH_LAUNCH_INTERPRETER";
pub const ENV_PROJECT: &str = "SCRATCH_LAUNCH_PROJECT";
pub const ENV_KEEP_CWD: &str = "SCRATCH_LAUNCH_KEEP_CWD";
pub const ENV_WAIT: &str = "SCRATCH_LAUNCH_WAIT";
pub const ENV_DRY_RUN: &str = "SCRATCH_LAUNCH_DRY_RUN";

pub const DEFAULT_SCRATCH_ROOT: &str = "/scratch";
pub const DEFAULT_PROFILER: &str = "nsys";
pub const DEFAULT_PROFILER_ARGS: &[&str] = &["profile"];
pub const DEFAULT_INTERPRETER: &str = "julia";

/// Name of the convenience link created inside the user's home directory.
pub const HOME_LINK_NAME: &str = "scratch";

/// The interpreter misbehaves when started from a shared filesystem root
/// (upstream bug, root cause unknown). Starting it from the per-user scratch
/// directory avoids the problem. Switch this to `Inherit` once upstream is
/// fixed.
pub const DEFAULT_WORKDIR_POLICY: WorkdirPolicy = WorkdirPolicy::Scratch;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Working directory handed to the launched process.
pub enum WorkdirPolicy {
    /// Start the child inside the user's scratch directory.
    #[default]
    Scratch,
    /// Keep the caller's working directory.
    Inherit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// How control is handed to the profiler.
pub enum LaunchMode {
    /// Replace the launcher process image; the exit code is the child's by construction.
    #[default]
    Exec,
    /// Spawn the child, wait for it and return its exit code.
    Wait,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LauncherConfig {
    /// User identifier namespacing the scratch directory.
    pub user: String,
    /// Home directory receiving the `scratch` link.
    pub home: PathBuf,
    /// Root under which per-user scratch directories live.
    pub scratch_root: PathBuf,
    /// Profiler wrapper binary.
    pub profiler: PathBuf,
    /// Arguments passed to the profiler before the interpreter.
    pub profiler_args: Vec<OsString>,
    /// Interpreter launched under the profiler.
    pub interpreter: PathBuf,
    /// Project directory override; relative paths resolve against the launcher directory.
    pub project: Option<PathBuf>,
    pub workdir_policy: WorkdirPolicy,
    pub launch_mode: LaunchMode,
    /// Run setup and report the launch plan without starting the child.
    pub dry_run: bool,
}

impl LauncherConfig {
    /// Configuration with default tools and policies for the given identity.
    pub fn new(
        user: impl Into<String>,
        home: impl Into<PathBuf>,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            user: user.into(),
            home: home.into(),
            scratch_root: scratch_root.into(),
            profiler: PathBuf::from(DEFAULT_PROFILER),
            profiler_args: DEFAULT_PROFILER_ARGS.iter().map(OsString::from).collect(),
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
            project: None,
            workdir_policy: DEFAULT_WORKDIR_POLICY,
            launch_mode: LaunchMode::default(),
            dry_run: false,
        }
    }

    pub fn from_env() -> Result<Self, LaunchError> {
        Self::from_lookup(|name| env::var_os(name))
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LaunchError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let user = non_empty(ENV_USER)
            .or_else(|| non_empty(ENV_LOGNAME))
            .ok_or(LaunchError::MissingEnv { name: ENV_USER })?;
        let user = user
            .into_string()
            .map_err(|raw| LaunchError::InvalidUser {
                user: raw.to_string_lossy().into_owned(),
            })?;
        validate_user(&user)?;

        let home = non_empty(ENV_HOME)
            .map(PathBuf::from)
            .ok_or(LaunchError::MissingEnv { name: ENV_HOME })?;
        require_absolute(ENV_HOME, &home)?;

        let scratch_root = non_empty(ENV_SCRATCH_ROOT)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRATCH_ROOT));
        require_absolute(ENV_SCRATCH_ROOT, &scratch_root)?;

        let mut config = Self::new(user, home, scratch_root);

        if let Some(profiler) = non_empty(ENV_PROFILER) {
            config.profiler = PathBuf::from(profiler);
        }
        // Set-but-empty means "no profiler arguments", so use the raw lookup here.
        if let Some(args) = lookup(ENV_PROFILER_ARGS) {
            config.profiler_args = split_args(&args);
        }
        if let Some(interpreter) = non_empty(ENV_INTERPRETER) {
            config.interpreter = PathBuf::from(interpreter);
        }
        config.project = non_empty(ENV_PROJECT).map(PathBuf::from);

        if is_truthy(lookup(ENV_KEEP_CWD).as_deref()) {
            config.workdir_policy = WorkdirPolicy::Inherit;
        }
        if is_truthy(lookup(ENV_WAIT).as_deref()) {
            config.launch_mode = LaunchMode::Wait;
        }
        config.dry_run = is_truthy(lookup(ENV_DRY_RUN).as_deref());

        Ok(config)
    }
}

/// A user identifier becomes a single path segment under the scratch root, so
/// it must not be able to escape it.
fn validate_user(user: &str) -> Result<(), LaunchError> {
    if user.is_empty() || user == "." || user == ".." || user.contains('/') || user.contains('\0')
    {
        return Err(LaunchError::InvalidUser {
            user: user.to_string(),
        });
    }
    Ok(())
}

fn require_absolute(name: &'static str, path: &Path) -> Result<(), LaunchError> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(LaunchError::RelativePath {
            name,
            path: path.to_path_buf(),
        })
    }
}

/// Split on ASCII whitespace without decoding, so arbitrary bytes survive.
fn split_args(raw: &OsStr) -> Vec<OsString> {
    raw.as_bytes()
        .split(u8::is_ascii_whitespace)
        .filter(|word| !word.is_empty())
        .map(|word| OsStr::from_bytes(word).to_os_string())
        .collect()
}

fn is_truthy(value: Option<&OsStr>) -> bool {
    let Some(value) = value.and_then(OsStr::to_str) else {
        return false;
    };
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
