use anyhow::Result;
use clap::Parser;

use crate::cli::handlers::commons::{self, Session};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Launches a program through its runtime and streams its output."
)]
struct RunArgs {
    /// Link of the program, e.g. /programs/tools/editor.
    program: String,
}

pub fn handle(args: Vec<String>, session: &mut Session) -> Result<()> {
    let run_args = RunArgs::try_parse_from(&args)?;
    let spec = session.registry.launch_spec(&run_args.program)?;
    log::debug!("Launching '{}' with {:?}", run_args.program, spec.args);

    let process = spec.to_process(&run_args.program)?;
    commons::run_supervised(process, session)
}
