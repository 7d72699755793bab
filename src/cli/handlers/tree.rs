use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::handlers::commons::{self, Session},
    core::{data_source::DefinitionDataSource, node::NodeId},
    models::LeafKind,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Displays the definition hierarchy as a tree."
)]
struct TreeArgs {
    /// Link of the folder to start from. Defaults to all three trees.
    link: Option<String>,

    /// Limit the depth of the tree display.
    #[arg(long, short)]
    depth: Option<usize>,

    /// Show the backing file of each node.
    #[arg(long, short)]
    paths: bool,

    /// Print the tree as JSON.
    #[arg(long)]
    json: bool,
}

pub fn handle(args: Vec<String>, session: &mut Session) -> Result<()> {
    let tree_args = TreeArgs::try_parse_from(&args)?;

    let starts: Vec<(&DefinitionDataSource, NodeId)> = match &tree_args.link {
        Some(link) => vec![session.locate(link)?],
        None => [LeafKind::Program, LeafKind::Library, LeafKind::Runtime]
            .into_iter()
            .map(|kind| {
                let source = session.registry.source(kind);
                (source, source.root())
            })
            .collect(),
    };

    if tree_args.json {
        let values: Vec<serde_json::Value> = starts
            .iter()
            .map(|(source, id)| commons::node_json(source, *id, tree_args.depth))
            .collect();
        let output = match values.as_slice() {
            [single] => serde_json::to_string_pretty(single)?,
            _ => serde_json::to_string_pretty(&values)?,
        };
        println!("{output}");
        return Ok(());
    }

    for (source, id) in starts {
        let Some(node) = source.node(id) else { continue };
        let link = source.link_string(id).unwrap_or_default();
        println!("\n{}", commons::paint(&link, node.kind()));
        print_children(source, id, "", 1, &tree_args);
    }
    Ok(())
}

/// Recursively prints the children of `id` with box-drawing connectors.
fn print_children(
    source: &DefinitionDataSource,
    id: NodeId,
    prefix: &str,
    level: usize,
    options: &TreeArgs,
) {
    if options.depth.is_some_and(|max| level > max) {
        return;
    }
    let children = source.children(id);
    for (i, child) in children.iter().enumerate() {
        let Some(node) = source.node(*child) else {
            continue;
        };
        let is_last = i + 1 == children.len();
        let connector = if is_last { "└── " } else { "├── " };
        let mut line = format!("{prefix}{connector}{}", commons::paint(node.name(), node.kind()));
        if options.paths {
            line.push_str(&format!(" {}", node.path().display().to_string().dimmed()));
        }
        println!("{line}");

        if node.is_folder() {
            let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
            print_children(source, *child, &child_prefix, level + 1, options);
        }
    }
}
