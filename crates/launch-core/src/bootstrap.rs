//! Filesystem preparation performed before the profiler is started.
//!
//! Every step is idempotent: running the bootstrapper again for the same user
//! leaves the filesystem exactly as the first run did.

use std::{
    env,
    ffi::OsString,
    fs,
    io::ErrorKind,
    os::unix::fs::symlink,
    path::{Path, PathBuf},
};

use tracing::{debug, info, info_span};

use crate::{
    command::LaunchCommand,
    config::{HOME_LINK_NAME, LauncherConfig, WorkdirPolicy},
    error::LaunchError,
    launch::LaunchPlan,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Result of the home-link step.
pub enum SymlinkOutcome {
    /// The link did not exist and was created.
    Created,
    /// Something already occupied the link path and was left untouched.
    AlreadyPresent,
}

/// Directory containing the running executable, with symlinks resolved.
pub fn resolve_self_directory() -> Result<PathBuf, LaunchError> {
    let exe = env::current_exe().map_err(|source| LaunchError::ResolveSelf {
        path: PathBuf::from("<current executable>"),
        source,
    })?;
    self_directory_of(&exe)
}

/// Canonicalise `path` and return its parent directory.
pub fn self_directory_of(path: &Path) -> Result<PathBuf, LaunchError> {
    let resolved = fs::canonicalize(path).map_err(|source| LaunchError::ResolveSelf {
        path: path.to_path_buf(),
        source,
    })?;
    match resolved.parent() {
        Some(parent) => Ok(parent.to_path_buf()),
        None => Err(LaunchError::NoParent { path: resolved }),
    }
}

/// Create `root/user` (and any missing parents) unless it already exists.
pub fn ensure_scratch_directory(root: &Path, user: &str) -> Result<PathBuf, LaunchError> {
    let path = root.join(user);
    fs::create_dir_all(&path).map_err(|source| LaunchError::ScratchDirectory {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), "scratch directory ready");
    Ok(path)
}

/// Link `home/scratch` to `target` if and only if nothing occupies that path.
///
/// The presence check does not follow links, so a dangling link counts as
/// present and is never replaced.
pub fn ensure_home_symlink(home: &Path, target: &Path) -> Result<SymlinkOutcome, LaunchError> {
    let link = home.join(HOME_LINK_NAME);
    match fs::symlink_metadata(&link) {
        Ok(_) => {
            debug!(link = %link.display(), "home link already present, leaving it alone");
            return Ok(SymlinkOutcome::AlreadyPresent);
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(source) => return Err(LaunchError::InspectLink { path: link, source }),
    }

    match symlink(target, &link) {
        Ok(()) => {
            info!(link = %link.display(), target = %target.display(), "created home link");
            Ok(SymlinkOutcome::Created)
        }
        // A concurrent launch by the same user got there first.
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(SymlinkOutcome::AlreadyPresent),
        Err(source) => Err(LaunchError::HomeSymlink {
            link,
            target: target.to_path_buf(),
            source,
        }),
    }
}

/// Working directory for the child, or `None` to inherit the caller's.
pub fn select_working_directory(policy: WorkdirPolicy, scratch: &Path) -> Option<PathBuf> {
    match policy {
        WorkdirPolicy::Scratch => Some(scratch.to_path_buf()),
        WorkdirPolicy::Inherit => None,
    }
}

/// Runs the setup sequence for one launch and produces the [`LaunchPlan`].
pub struct Bootstrapper {
    config: LauncherConfig,
    self_dir: PathBuf,
}

impl Bootstrapper {
    /// Resolve the launcher's own directory and keep it alongside `config`.
    pub fn new(config: LauncherConfig) -> Result<Self, LaunchError> {
        let self_dir = resolve_self_directory()?;
        Ok(Self::with_self_dir(config, self_dir))
    }

    pub fn with_self_dir(config: LauncherConfig, self_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            self_dir: self_dir.into(),
        }
    }

    /// Project directory passed to the interpreter.
    pub fn project_dir(&self) -> PathBuf {
        match &self.config.project {
            Some(project) => self.self_dir.join(project),
            None => self.self_dir.clone(),
        }
    }

    /// Scratch directory, home link, working directory, then the command.
    /// Stops at the first failing step.
    pub fn prepare(&self, extra_args: Vec<OsString>) -> Result<LaunchPlan, LaunchError> {
        let span = info_span!("bootstrap", user = %self.config.user);
        let _enter = span.enter();

        let scratch_dir = ensure_scratch_directory(&self.config.scratch_root, &self.config.user)?;
        let symlink = ensure_home_symlink(&self.config.home, &scratch_dir)?;
        let working_dir = select_working_directory(self.config.workdir_policy, &scratch_dir);

        let command = LaunchCommand::new(
            &self.config.profiler,
            &self.config.interpreter,
            self.project_dir(),
        )
        .with_profiler_args(self.config.profiler_args.iter().cloned())
        .with_extra_args(extra_args);

        Ok(LaunchPlan {
            command,
            working_dir,
            scratch_dir,
            symlink,
        })
    }
}
