use std::ffi::OsString;

/// Everything after the program name, untouched. The launcher owns no flags:
/// `--help`, `--` and friends all belong to the interpreter.
pub fn forwarded_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter().skip(1).collect()
}
