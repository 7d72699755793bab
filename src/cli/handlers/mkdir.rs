use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::cli::handlers::commons::Session;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Creates a folder in a definition tree.")]
struct MkdirArgs {
    /// Link of the parent folder, e.g. /programs.
    parent: String,

    /// Name of the new folder.
    name: String,
}

pub fn handle(args: Vec<String>, session: &mut Session) -> Result<()> {
    let mkdir_args = MkdirArgs::try_parse_from(&args)?;
    let (source, parent) = session.locate_mut(&mkdir_args.parent)?;
    let id = source.create_folder(parent, &mkdir_args.name)?;
    println!(
        "{} Created folder {}",
        "✔".green().bold(),
        source.link_string(id).unwrap_or_default().blue().bold()
    );
    Ok(())
}
