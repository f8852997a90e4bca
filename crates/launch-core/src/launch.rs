use std::{
    env, fmt,
    os::unix::process::{CommandExt, ExitStatusExt},
    path::{Path, PathBuf},
    process::ExitStatus,
};

use tracing::{debug, info};

use crate::{
    bootstrap::SymlinkOutcome, command::LaunchCommand, config::LaunchMode, error::LaunchError,
};

/// Offset added to a terminating signal number, as shells report it.
const SIGNAL_EXIT_BASE: i32 = 128;

/// Everything needed to start the child once setup has succeeded.
#[derive(Clone, Debug)]
pub struct LaunchPlan {
    pub command: LaunchCommand,
    /// `None` keeps the caller's working directory.
    pub working_dir: Option<PathBuf>,
    pub scratch_dir: PathBuf,
    pub symlink: SymlinkOutcome,
}

impl LaunchPlan {
    /// Move the current process into the planned working directory.
    pub fn enter_working_directory(&self) -> Result<(), LaunchError> {
        let Some(dir) = &self.working_dir else {
            return Ok(());
        };
        env::set_current_dir(dir).map_err(|source| LaunchError::WorkingDirectory {
            path: dir.clone(),
            source,
        })?;
        debug!(dir = %dir.display(), "changed working directory");
        Ok(())
    }

    pub fn launch(&self, mode: LaunchMode) -> Result<i32, LaunchError> {
        launch(&self.command, self.working_dir.as_deref(), mode)
    }
}

impl fmt::Display for LaunchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dir) = &self.working_dir {
            write!(
                f,
                "cd {} && ",
                crate::command::shell_quote(dir.as_os_str())
            )?;
        }
        write!(f, "{}", self.command)
    }
}

/// Start the profiler and hand over control.
///
/// `Exec` replaces the current process and only returns on failure. `Wait`
/// runs the child to completion and returns its exit code, mapping a fatal
/// signal `N` to `128 + N`.
pub fn launch(
    command: &LaunchCommand,
    working_dir: Option<&Path>,
    mode: LaunchMode,
) -> Result<i32, LaunchError> {
    let mut cmd = command.to_command(working_dir);
    info!(mode = ?mode, command = %command, "launching profiler");

    let spawn_error = |source| LaunchError::Spawn {
        program: command.program().as_os_str().to_os_string(),
        source,
    };

    match mode {
        LaunchMode::Exec => Err(spawn_error(cmd.exec())),
        LaunchMode::Wait => {
            let status = cmd.status().map_err(spawn_error)?;
            let code = exit_code_of(status);
            debug!(code, "child exited");
            Ok(code)
        }
    }
}

pub fn exit_code_of(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => SIGNAL_EXIT_BASE + signal,
        (None, None) => 1,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn shell(script: &str) -> LaunchCommand {
        // `sh -c <script> sh <interpreter> --project=.. --color=yes ..`: the
        // trailing words become positional parameters the script can ignore.
        LaunchCommand::new("/bin/sh", "julia", "/p").with_profiler_args(["-c", script, "sh"])
    }

    #[test]
    fn wait_mode_propagates_exit_code() {
        assert_eq!(launch(&shell("exit 0"), None, LaunchMode::Wait).unwrap(), 0);
        assert_eq!(launch(&shell("exit 3"), None, LaunchMode::Wait).unwrap(), 3);
        assert_eq!(launch(&shell("exit 255"), None, LaunchMode::Wait).unwrap(), 255);
    }

    #[test]
    fn wait_mode_maps_signals() {
        let code = launch(&shell("kill -TERM $$"), None, LaunchMode::Wait).unwrap();
        assert_eq!(code, 128 + 15);
    }

    #[test]
    fn child_receives_forwarded_args_and_working_dir() {
        let tmp = TempDir::new().unwrap();
        let record = tmp.path().join("record");
        let script = format!(
            "pwd -P > '{}'; printf '%s\\n' \"$@\" >> '{}'",
            record.display(),
            record.display()
        );
        let command = shell(&script).with_extra_args(["a.jl", "--flag", "x"]);

        let code = launch(&command, Some(tmp.path()), LaunchMode::Wait).unwrap();

        assert_eq!(code, 0);
        let recorded = fs::read_to_string(&record).unwrap();
        let lines: Vec<&str> = recorded.lines().collect();
        let expected_cwd = fs::canonicalize(tmp.path()).unwrap();
        assert_eq!(lines[0], expected_cwd.to_str().unwrap());
        assert_eq!(
            &lines[1..],
            ["julia", "--project=/p", "--color=yes", "a.jl", "--flag", "x"]
        );
    }

    #[test]
    fn missing_profiler_is_a_spawn_error() {
        let command = LaunchCommand::new("/nonexistent/nsys", "julia", "/p");
        let err = launch(&command, None, LaunchMode::Wait).unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn plan_renders_as_shell_line() {
        let plan = LaunchPlan {
            command: LaunchCommand::new("nsys", "julia", "/p").with_extra_args(["a.jl"]),
            working_dir: Some(PathBuf::from("/scratch/alice")),
            scratch_dir: PathBuf::from("/scratch/alice"),
            symlink: SymlinkOutcome::Created,
        };
        assert_eq!(
            plan.to_string(),
            "cd /scratch/alice && nsys julia --project=/p --color=yes a.jl"
        );
    }
}
