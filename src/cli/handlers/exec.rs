use anyhow::{Result, anyhow};
use clap::Parser;

use crate::{
    cli::handlers::commons::{self, Session},
    core::paths,
    system::process::ManagedProcess,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Runs an arbitrary command under supervision."
)]
struct ExecArgs {
    /// Directory to start the command in.
    #[arg(long, short = 'C', value_name = "DIR")]
    cwd: Option<String>,

    /// The command to run: one quoted command line, or the program and its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    command: Vec<String>,
}

pub fn handle(args: Vec<String>, session: &mut Session) -> Result<()> {
    let exec_args = ExecArgs::try_parse_from(&args)?;
    let cwd = exec_args.cwd.as_deref().map(paths::expand).transpose()?;

    // A single argument is a full command line; several are an argument vector.
    let process = match exec_args.command.as_slice() {
        [] => return Err(anyhow!("No command specified to run.")),
        [line] => ManagedProcess::from_command(line)?,
        argv => ManagedProcess::new(argv.join(" "), argv, None)?,
    };
    let process = process.with_cwd(cwd.as_deref());
    commons::run_supervised(process, session)
}
