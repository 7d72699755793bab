// src/bin/defreg.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use defreg::cli::{
    Cli,
    handlers::{self, commons::Session},
};

// --- Command Definition and Registry ---

/// A command, its aliases, and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &mut Session) -> Result<()>,
}

static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "add-library",
        aliases: &["addlib"],
        handler: handlers::add::handle_library,
    },
    CommandDefinition {
        name: "add-program",
        aliases: &["addprog"],
        handler: handlers::add::handle_program,
    },
    CommandDefinition {
        name: "add-runtime",
        aliases: &["addrt"],
        handler: handlers::add::handle_runtime,
    },
    CommandDefinition {
        name: "args",
        aliases: &[],
        handler: handlers::args::handle,
    },
    CommandDefinition {
        name: "delete",
        aliases: &["del", "rm"],
        handler: handlers::delete::handle,
    },
    CommandDefinition {
        name: "exec",
        aliases: &[],
        handler: handlers::exec::handle,
    },
    CommandDefinition {
        name: "mkdir",
        aliases: &[],
        handler: handlers::mkdir::handle,
    },
    CommandDefinition {
        name: "run",
        aliases: &[],
        handler: handlers::run::handle,
    },
    CommandDefinition {
        name: "show",
        aliases: &["info"],
        handler: handlers::show::handle,
    },
    CommandDefinition {
        name: "tree",
        aliases: &["ls"],
        handler: handlers::tree::handle,
    },
];

fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Sets up logging, dispatches to the handler, and reports errors in one place.
fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        // Help and version requests from a handler's parser are not failures.
        if let Some(clap_err) = e.downcast_ref::<clap::Error>()
            && !clap_err.use_stderr()
        {
            let _ = clap_err.print();
            std::process::exit(0);
        }
        eprintln!("\n{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let Some(name) = cli.command else {
        return handlers::tree::handle(Vec::new(), &mut Session::open(cli.base_dir.as_deref())?);
    };
    let command = find_command(&name).ok_or_else(|| {
        anyhow!(
            "Unknown command '{}'. Run `defreg --help` for the list of commands.",
            name
        )
    })?;

    let mut session = Session::open(cli.base_dir.as_deref())?;
    log::debug!(
        "Dispatching '{}' against '{}'",
        command.name,
        session.base_dir.display()
    );
    (command.handler)(cli.args, &mut session)
}
