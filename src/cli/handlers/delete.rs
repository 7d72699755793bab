use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use dialoguer::{Confirm, theme::ColorfulTheme};

use crate::cli::handlers::commons::Session;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Deletes a definition, or a folder that is already empty."
)]
struct DeleteArgs {
    /// Link of the node to delete.
    link: String,

    /// Skip the confirmation prompt.
    #[arg(long, short)]
    yes: bool,
}

pub fn handle(args: Vec<String>, session: &mut Session) -> Result<()> {
    let delete_args = DeleteArgs::try_parse_from(&args)?;
    let (source, id) = session.locate_mut(&delete_args.link)?;
    if id == source.root() {
        return Err(anyhow!("The root folder '{}' cannot be deleted.", delete_args.link));
    }
    let path = source
        .node(id)
        .map(|n| n.path().display().to_string())
        .unwrap_or_default();

    println!("\n{}", "This permanently removes:".red().bold());
    println!("    • {}", path);

    if !delete_args.yes
        && !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete '{}'?", delete_args.link))
            .default(false)
            .interact()?
    {
        println!("\nOperation cancelled.");
        return Ok(());
    }

    source.delete(id)?;
    log::info!("Deleted '{}' ({})", delete_args.link, path);
    println!("\n{} Deleted {}", "✔".green().bold(), delete_args.link);
    Ok(())
}
