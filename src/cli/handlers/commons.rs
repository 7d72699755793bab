// src/cli/handlers/commons.rs

// Shared helpers used by multiple handlers.

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use serde_json::{Value, json};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::{
    constants::{EVENT_AFTER_EXECUTE, EVENT_BEFORE_EXECUTE},
    core::{
        data_source::DefinitionDataSource,
        node::NodeId,
        paths,
        registry::Registry,
        settings::{self, Settings},
    },
    models::NodeKind,
    system::{
        events::FnListener,
        process::ManagedProcess,
        runtime_manager::{RuntimeEvent, RuntimeManager},
        task::{LogSink, Task, TaskError},
    },
};

/// Everything a handler needs: the loaded registry and the settings.
#[derive(Debug)]
pub struct Session {
    pub base_dir: PathBuf,
    pub settings: Settings,
    pub registry: Registry,
}

impl Session {
    /// Resolves the base directory, loads `defreg.toml` and the three trees.
    /// A tree that fails to load is reported and left empty.
    pub fn open(base_dir: Option<&str>) -> Result<Self> {
        let base_dir = paths::resolve_base_dir(base_dir)?;
        let settings = settings::load_settings(&base_dir)
            .with_context(|| format!("Failed to load settings from '{}'", base_dir.display()))?;
        let mut registry = Registry::new(&base_dir);
        for (kind, error) in registry.load() {
            eprintln!(
                "{} {:?} definitions could not be loaded: {}",
                "Warning:".yellow().bold(),
                kind,
                error
            );
        }
        Ok(Self {
            base_dir,
            settings,
            registry,
        })
    }

    /// Finds the tree holding `link` and the node it names.
    pub fn locate(&self, link: &str) -> Result<(&DefinitionDataSource, NodeId)> {
        let source = self
            .registry
            .source_for_link(link)
            .ok_or_else(|| anyhow!("No definition or folder at '{}'.", link))?;
        let id = source
            .find_node(link)
            .ok_or_else(|| anyhow!("No definition or folder at '{}'.", link))?;
        Ok((source, id))
    }

    /// Mutable counterpart of [`locate`](Self::locate).
    pub fn locate_mut(&mut self, link: &str) -> Result<(&mut DefinitionDataSource, NodeId)> {
        let source = self
            .registry
            .source_for_link_mut(link)
            .ok_or_else(|| anyhow!("No definition or folder at '{}'.", link))?;
        let id = source
            .find_node(link)
            .ok_or_else(|| anyhow!("No definition or folder at '{}'.", link))?;
        Ok((source, id))
    }
}

/// Colors a node name by its kind.
pub fn paint(name: &str, kind: NodeKind) -> String {
    match kind {
        NodeKind::Folder => name.blue().bold().to_string(),
        NodeKind::Program => name.green().to_string(),
        NodeKind::Library => name.cyan().to_string(),
        NodeKind::Runtime => name.magenta().to_string(),
    }
}

/// JSON view of a node and, up to `depth` levels, its descendants.
pub fn node_json(source: &DefinitionDataSource, id: NodeId, depth: Option<usize>) -> Value {
    let Some(node) = source.node(id) else {
        return Value::Null;
    };
    let mut value = json!({
        "name": node.name(),
        "link": source.link_string(id),
        "kind": node.kind(),
        "path": node.path(),
    });
    if !node.is_folder()
        && let Ok(payload) = serde_json::to_value(node.data())
        && let Some(map) = value.as_object_mut()
    {
        map.insert("definition".to_string(), payload);
    }
    if node.is_folder() && depth != Some(0) {
        let children: Vec<Value> = source
            .children(id)
            .iter()
            .map(|child| node_json(source, *child, depth.map(|d| d.saturating_sub(1))))
            .collect();
        if let Some(map) = value.as_object_mut() {
            map.insert("children".to_string(), Value::Array(children));
        }
    }
    value
}

/// Writes captured task output to the terminal as it arrives.
#[derive(Debug, Default)]
pub struct ConsoleLog;

impl LogSink for ConsoleLog {
    fn write(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

/// Runs `process` on a fresh runtime manager and blocks until it finishes.
pub fn run_supervised(process: ManagedProcess, session: &Session) -> Result<()> {
    let manager = RuntimeManager::new(&session.settings.pool);

    manager
        .events()
        .add_listener(Arc::new(FnListener::new(
            EVENT_BEFORE_EXECUTE,
            |_: i32, event: &RuntimeEvent| {
                if let RuntimeEvent::BeforeExecute { worker, task } = event {
                    log::info!("Task '{}' started on '{}'.", task.name(), worker.name);
                }
            },
        )));

    let failure: Arc<Mutex<Option<Arc<TaskError>>>> = Arc::new(Mutex::new(None));
    let outcome = failure.clone();
    manager
        .events()
        .add_listener(Arc::new(FnListener::new(
            EVENT_AFTER_EXECUTE,
            move |_: i32, event: &RuntimeEvent| {
                if let RuntimeEvent::AfterExecute { error, .. } = event {
                    *outcome.lock().unwrap_or_else(PoisonError::into_inner) = error.clone();
                }
            },
        )));

    let process = Arc::new(process.with_log(Arc::new(ConsoleLog)));
    println!(
        "{} {} {}",
        "▶".green().bold(),
        process.name().bold(),
        format!("(task {})", process.task_info().id()).dimmed()
    );
    manager.take(process.clone())?;
    manager.shutdown();
    while !manager.await_termination(Duration::from_secs(1)) {
        log::trace!("Waiting for '{}' to finish...", process.name());
    }

    let elapsed = process.elapsed_seconds().unwrap_or(0);
    let error = failure.lock().unwrap_or_else(PoisonError::into_inner).take();
    match error {
        Some(e) => Err(anyhow!("{}", e)),
        None => {
            println!(
                "\n{} {} {}",
                "✔".green().bold(),
                process.name().bold(),
                format!("finished in {elapsed}s").dimmed()
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Library, NodeData};
    use tempfile::TempDir;

    #[test]
    fn test_session_locates_nodes_across_trees() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::open(dir.path().to_str()).unwrap();
        let libs = session.registry.libraries_mut();
        let root = libs.root();
        libs.create_leaf(root, "gson", NodeData::Library(Library::default()))
            .unwrap();

        let (source, id) = session.locate("/libs/gson").unwrap();
        assert_eq!(source.link_string(id).as_deref(), Some("/libs/gson"));
        assert!(session.locate("/runtimes/default").is_ok());
        assert!(session.locate("/libs/missing").is_err());
    }

    #[test]
    fn test_node_json_respects_depth() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::open(dir.path().to_str()).unwrap();
        let libs = session.registry.libraries_mut();
        let root = libs.root();
        let folder = libs.create_folder(root, "json").unwrap();
        libs.create_leaf(folder, "gson", NodeData::Library(Library::default()))
            .unwrap();

        let libs = session.registry.libraries();
        let full = node_json(libs, libs.root(), None);
        assert_eq!(full["children"][0]["children"][0]["link"], "/libs/json/gson");
        assert_eq!(full["children"][0]["children"][0]["kind"], "library");

        let shallow = node_json(libs, libs.root(), Some(1));
        assert_eq!(shallow["children"][0]["name"], "json");
        assert!(shallow["children"][0].get("children").is_none());
    }
}
