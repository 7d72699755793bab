use clap::Parser;

pub mod handlers;

/// Command summary shown after the generated usage text.
const COMMANDS_HELP: &str = "\
Commands:
  tree [link] [--json]            Show a definition tree (all three by default)
  show <link> [--json]            Show one definition
  args <program> [--line]         Print the invocation built for a program
  run <program>                   Launch a program and stream its output
  exec <command...>               Run an arbitrary command under supervision
  mkdir <parent> <name>           Create a folder
  add-program <parent> <name>     Create a program definition
  add-library <parent> <name>     Create a library definition
  add-runtime <parent> <name>     Create a runtime definition
  delete <link> [--yes]           Delete a definition or an empty folder

Links are slash-separated paths such as /programs/tools/editor.
Run `defreg <command> --help` for the options of a command.";

/// defreg: a file-backed registry of programs, libraries and runtimes.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    after_help = COMMANDS_HELP,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Registry directory. Defaults to $DEFREG_HOME, then the user data directory.
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<String>,

    /// The command to run.
    pub command: Option<String>,

    /// Arguments passed to the command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
