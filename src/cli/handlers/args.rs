use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::cli::handlers::commons::Session;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Prints the invocation arguments built for a program."
)]
struct ArgsArgs {
    /// Link of the program, e.g. /programs/tools/editor.
    program: String,

    /// Print a single command line instead of one argument per line.
    #[arg(long, conflicts_with = "json")]
    line: bool,

    /// Print the arguments as a JSON array.
    #[arg(long)]
    json: bool,
}

pub fn handle(args: Vec<String>, session: &mut Session) -> Result<()> {
    let args_args = ArgsArgs::try_parse_from(&args)?;
    let spec = session.registry.launch_spec(&args_args.program)?;

    if args_args.json {
        println!("{}", serde_json::to_string_pretty(&spec.args)?);
    } else if args_args.line {
        println!("{}", spec.command_line());
    } else {
        for (i, arg) in spec.args.iter().enumerate() {
            println!("{:>3} {}", i.to_string().dimmed(), arg);
        }
        if let Some(dir) = &spec.working_dir {
            println!("{} {}", "cwd".dimmed(), dir.display());
        }
    }
    Ok(())
}
