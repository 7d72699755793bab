use anyhow::Result;
use clap::Parser;
use colored::*;

use crate::{
    cli::handlers::commons::{self, Session},
    models::NodeData,
};

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Displays one definition or folder.")]
struct ShowArgs {
    /// Link of the node, e.g. /programs/tools/editor.
    link: String,

    /// Print the node as JSON.
    #[arg(long)]
    json: bool,
}

pub fn handle(args: Vec<String>, session: &mut Session) -> Result<()> {
    let show_args = ShowArgs::try_parse_from(&args)?;
    let (source, id) = session.locate(&show_args.link)?;

    if show_args.json {
        let value = commons::node_json(source, id, Some(1));
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let Some(node) = source.node(id) else {
        return Ok(());
    };
    println!(
        "\n--- {} '{}' ---",
        format!("{:?}", node.kind()).bold(),
        commons::paint(node.name(), node.kind())
    );
    field("Link", &source.link_string(id).unwrap_or_default());
    field("File", &node.path().display().to_string());

    match node.data() {
        NodeData::Folder => {
            let names: Vec<String> = source
                .children(id)
                .iter()
                .filter_map(|c| source.node(*c))
                .map(|c| commons::paint(c.name(), c.kind()))
                .collect();
            field("Children", &names.join(", "));
        }
        NodeData::Program(p) => {
            field("Name", &p.name);
            field("Version", &p.version);
            field("Runtime", &p.runtime);
            field("Main", &p.main);
            field("Archive", &p.archive);
            field("Arguments", &p.arguments);
            field("Libraries", &p.library_links().join(", "));
            field("Work dir", &p.workdir);
            field("Source", &p.source);
            field("Docs", &p.docs);
            field("Description", &p.description);
            extra(&p.extra);
            let unresolved = session.registry.unresolved_libraries(p);
            if !unresolved.is_empty() {
                println!(
                    "  {}",
                    format!("Unresolved libraries: {}", unresolved.join(", ")).yellow()
                );
            }
            if let Err(e) = session.registry.resolve_runtime(p) {
                println!("  {}", e.to_string().yellow());
            }
        }
        NodeData::Library(l) => {
            field("Name", &l.name);
            field("Version", &l.version);
            field("Path", &l.path);
            field("Source", &l.source);
            field("Docs", &l.docs);
            field("Description", &l.description);
            extra(&l.extra);
        }
        NodeData::Runtime(r) => {
            field("Name", &r.name);
            field("Version", &r.version);
            field("Executable", &r.path);
            field("Arguments", &r.arguments);
            field("Description", &r.description);
            extra(&r.extra);
        }
    }
    Ok(())
}

fn field(label: &str, value: &str) {
    if !value.is_empty() {
        println!("  {:<12} {}", label.blue(), value);
    }
}

fn extra(properties: &crate::core::properties::Properties) {
    for (key, value) in properties {
        println!("  {:<12} {}", key.dimmed(), value);
    }
}
