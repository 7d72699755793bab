// src/cli/handlers/add.rs

// Handlers for `add-program`, `add-library` and `add-runtime`.

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::handlers::commons::{self, Session},
    constants::DEFAULT_ARGUMENT_TEMPLATE,
    models::{LeafKind, Library, NodeData, Program, RuntimeDefinition},
};

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Creates a program definition.")]
struct AddProgramArgs {
    /// Link of the parent folder, e.g. /programs/tools.
    parent: String,
    /// Name of the new definition.
    name: String,
    /// Link of the runtime that launches the program.
    #[arg(long, default_value = "/runtimes/default")]
    runtime: String,
    /// Link of a library the program depends on. Repeatable.
    #[arg(long = "lib", value_name = "LINK")]
    libraries: Vec<String>,
    /// The program's own archive.
    #[arg(long)]
    archive: Option<String>,
    /// Entry point substituted for `%m`.
    #[arg(long)]
    main: Option<String>,
    /// Arguments substituted for `%a`.
    #[arg(long, allow_hyphen_values = true)]
    arguments: Option<String>,
    /// Directory to start in, relative to the registry directory unless absolute.
    #[arg(long)]
    workdir: Option<String>,
    #[arg(long)]
    version: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Creates a library definition.")]
struct AddLibraryArgs {
    /// Link of the parent folder, e.g. /libs.
    parent: String,
    /// Name of the new definition.
    name: String,
    /// Path of the library archive.
    #[arg(long)]
    path: String,
    #[arg(long)]
    version: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Creates a runtime definition.")]
struct AddRuntimeArgs {
    /// Link of the parent folder, e.g. /runtimes.
    parent: String,
    /// Name of the new definition.
    name: String,
    /// Path of the runtime executable.
    #[arg(long)]
    path: String,
    /// Argument template; `%c`, `%m` and `%a` are substituted.
    #[arg(long, default_value = DEFAULT_ARGUMENT_TEMPLATE, allow_hyphen_values = true)]
    arguments: String,
    #[arg(long)]
    version: Option<String>,
    #[arg(long)]
    description: Option<String>,
}

pub fn handle_program(args: Vec<String>, session: &mut Session) -> Result<()> {
    let a = AddProgramArgs::try_parse_from(&args)?;
    if session.registry.find_runtime(&a.runtime).is_none() {
        log::warn!("Runtime '{}' does not exist yet.", a.runtime);
    }
    for link in &a.libraries {
        if session.registry.find_library(link).is_none() {
            log::warn!("Library '{}' does not exist yet.", link);
        }
    }

    let mut program = Program {
        name: a.name.clone(),
        runtime: a.runtime,
        archive: a.archive.unwrap_or_default(),
        main: a.main.unwrap_or_default(),
        arguments: a.arguments.unwrap_or_default(),
        workdir: a.workdir.unwrap_or_default(),
        version: a.version.unwrap_or_default(),
        description: a.description.unwrap_or_default(),
        ..Default::default()
    };
    program.set_library_links(a.libraries.as_slice());
    create(session, LeafKind::Program, &a.parent, &a.name, NodeData::Program(program))
}

pub fn handle_library(args: Vec<String>, session: &mut Session) -> Result<()> {
    let a = AddLibraryArgs::try_parse_from(&args)?;
    let library = Library {
        name: a.name.clone(),
        path: a.path,
        version: a.version.unwrap_or_default(),
        description: a.description.unwrap_or_default(),
        ..Default::default()
    };
    create(session, LeafKind::Library, &a.parent, &a.name, NodeData::Library(library))
}

pub fn handle_runtime(args: Vec<String>, session: &mut Session) -> Result<()> {
    let a = AddRuntimeArgs::try_parse_from(&args)?;
    let runtime = RuntimeDefinition {
        name: a.name.clone(),
        path: a.path,
        arguments: a.arguments,
        version: a.version.unwrap_or_default(),
        description: a.description.unwrap_or_default(),
        ..Default::default()
    };
    create(session, LeafKind::Runtime, &a.parent, &a.name, NodeData::Runtime(runtime))
}

fn create(
    session: &mut Session,
    kind: LeafKind,
    parent: &str,
    name: &str,
    data: NodeData,
) -> Result<()> {
    let node_kind = data.kind();
    let (source, parent_id) = session.locate_mut(parent)?;
    if source.leaf_kind() != kind {
        return Err(anyhow!(
            "'{}' is not in the {:?} tree; {:?} definitions cannot be created there.",
            parent,
            source.leaf_kind(),
            kind
        ));
    }
    let id = source.create_leaf(parent_id, name, data)?;
    println!(
        "{} Created {:?} {}",
        "✔".green().bold(),
        kind,
        commons::paint(&source.link_string(id).unwrap_or_default(), node_kind)
    );
    Ok(())
}
