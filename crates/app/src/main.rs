mod cli;
mod telemetry;

use anyhow::{Context, Result};
use launch_core::{Bootstrapper, LaunchError, LauncherConfig, SETUP_FAILURE_EXIT_CODE};
use tracing::info;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("scratch-launch: {err:?}");
            std::process::exit(exit_code_for(&err));
        }
    }
}

fn run() -> Result<i32> {
    telemetry::init();
    let forwarded = cli::forwarded_args(std::env::args_os());

    let config = LauncherConfig::from_env().context("invalid launcher environment")?;
    let dry_run = config.dry_run;
    let mode = config.launch_mode;

    let bootstrapper = Bootstrapper::new(config)?;
    let plan = bootstrapper.prepare(forwarded)?;

    if dry_run {
        println!("{plan}");
        return Ok(0);
    }

    plan.enter_working_directory()?;
    info!(scratch = %plan.scratch_dir.display(), "environment ready");
    let code = plan.launch(mode)?;
    Ok(code)
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<LaunchError>()
        .map_or(SETUP_FAILURE_EXIT_CODE, LaunchError::exit_code)
}
