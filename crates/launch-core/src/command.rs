use std::{
    ffi::{OsStr, OsString},
    fmt,
    path::{Path, PathBuf},
    process::Command,
};

/// Flag prefix selecting the interpreter's project environment.
pub const PROJECT_FLAG: &str = "--project=";
/// Forces colored output; the profiler hides the terminal from the interpreter.
pub const COLOR_FLAG: &str = "--color=yes";

/// Fully-specified profiler invocation:
/// `<profiler> <profiler_args..> <interpreter> --project=<dir> --color=yes <extra_args..>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchCommand {
    profiler: PathBuf,
    profiler_args: Vec<OsString>,
    interpreter: PathBuf,
    project_dir: PathBuf,
    extra_args: Vec<OsString>,
}

impl LaunchCommand {
    pub fn new(
        profiler: impl Into<PathBuf>,
        interpreter: impl Into<PathBuf>,
        project_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            profiler: profiler.into(),
            profiler_args: Vec::new(),
            interpreter: interpreter.into(),
            project_dir: project_dir.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_profiler_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.profiler_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Arguments forwarded to the interpreter untouched and in order.
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.profiler
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn extra_args(&self) -> &[OsString] {
        &self.extra_args
    }

    /// Everything after the program name.
    pub fn args(&self) -> Vec<OsString> {
        let mut project_flag = OsString::from(PROJECT_FLAG);
        project_flag.push(self.project_dir.as_os_str());

        let mut args = Vec::with_capacity(self.profiler_args.len() + self.extra_args.len() + 3);
        args.extend(self.profiler_args.iter().cloned());
        args.push(self.interpreter.clone().into_os_string());
        args.push(project_flag);
        args.push(OsString::from(COLOR_FLAG));
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Build the `std::process::Command`, optionally pinned to a working directory.
    pub fn to_command(&self, working_dir: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.profiler);
        cmd.args(self.args());
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(self.profiler.as_os_str()))?;
        for arg in self.args() {
            write!(f, " {}", shell_quote(&arg))?;
        }
        Ok(())
    }
}

/// Render an argument so it can be pasted back into a POSIX shell.
pub(crate) fn shell_quote(arg: &OsStr) -> String {
    let text = arg.to_string_lossy();
    let plain = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        text.into_owned()
    } else {
        format!("'{}'", text.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn sample() -> LaunchCommand {
        LaunchCommand::new("nsys", "julia", "/work/project")
            .with_profiler_args(["profile"])
            .with_extra_args(["a.jl", "--flag", "x"])
    }

    #[test]
    fn argument_vector_layout() {
        let args = sample().args();
        let expected: Vec<OsString> = [
            "profile",
            "julia",
            "--project=/work/project",
            "--color=yes",
            "a.jl",
            "--flag",
            "x",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn std_command_mirrors_layout() {
        let launch = sample();
        let cmd = launch.to_command(Some(Path::new("/scratch/alice")));
        assert_eq!(cmd.get_program(), OsStr::new("nsys"));
        let args: Vec<&OsStr> = cmd.get_args().collect();
        assert_eq!(args.len(), 7);
        assert_eq!(args[2], OsStr::new("--project=/work/project"));
        assert_eq!(args[6], OsStr::new("x"));
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/scratch/alice")));

        let cmd = launch.to_command(None);
        assert_eq!(cmd.get_current_dir(), None);
    }

    #[test]
    fn display_quotes_only_when_needed() {
        let launch = LaunchCommand::new("nsys", "julia", "/work/my project")
            .with_extra_args(["it's.jl", "", "-e"]);
        assert_eq!(
            launch.to_string(),
            r"nsys julia '--project=/work/my project' --color=yes 'it'\''s.jl' '' -e"
        );
    }

    proptest! {
        #[test]
        fn extra_args_pass_through_verbatim(extra in proptest::collection::vec(".*", 0..8)) {
            let launch = LaunchCommand::new("nsys", "julia", "/p")
                .with_profiler_args(["profile", "--stats=true"])
                .with_extra_args(extra.iter().cloned());
            let args = launch.args();
            let tail: Vec<String> = args[5..]
                .iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect();
            prop_assert_eq!(tail, extra);
        }
    }
}
