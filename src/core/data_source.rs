//! # Definition Data Source
//!
//! A [`DefinitionDataSource`] is a live index over one directory subtree. Nodes live in an
//! arena owned by the data source; a node owns its ordered list of children and keeps a
//! non-owning [`NodeId`] back-reference to its parent, used only to compute link paths.
//!
//! Nodes are addressed across the registry by their *link path*:
//! `/` + root name + (`/` + segment)*. Lookups walk the in-memory tree built by
//! [`load`](DefinitionDataSource::load); [`get_children`](DefinitionDataSource::get_children)
//! re-lists a folder from disk and reconciles the result with the tree.
//!
//! The tree is meant for a single writer. Callers that share a data source between
//! threads must serialize mutation themselves.

use crate::core::node::{self, DefinitionNode, NodeError, NodeId};
use crate::models::{LeafKind, NodeData};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref VALID_NAME: Regex = Regex::new(r#"^[^/\\:*?"<>|\x00-\x1f]+$"#)
        .unwrap_or_else(|_| unreachable!("static pattern"));
}

/// Receives structural change notifications from a data source.
pub trait TreeListener: Send {
    /// A node was attached to `parent` at position `index`.
    fn node_inserted(&self, parent: NodeId, index: usize) {
        let _ = (parent, index);
    }

    /// The node previously at `index` under `parent`, addressed by `link`, was removed.
    fn node_removed(&self, parent: NodeId, index: usize, link: &str) {
        let _ = (parent, index, link);
    }
}

/// Indexes a directory subtree into a tree of [`DefinitionNode`]s.
pub struct DefinitionDataSource {
    nodes: Vec<Option<DefinitionNode>>,
    root: NodeId,
    leaf_kind: LeafKind,
    listeners: Vec<Box<dyn TreeListener>>,
}

impl fmt::Debug for DefinitionDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinitionDataSource")
            .field("root", &self.root_path())
            .field("leaf_kind", &self.leaf_kind)
            .field("nodes", &self.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl DefinitionDataSource {
    /// Creates a data source rooted at `root_path`. Files found below it are decoded
    /// as `leaf_kind`. Nothing is read until [`load`](Self::load).
    pub fn new(root_path: impl Into<PathBuf>, leaf_kind: LeafKind) -> Self {
        Self {
            nodes: vec![Some(DefinitionNode::folder(root_path))],
            root: NodeId(0),
            leaf_kind,
            listeners: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn leaf_kind(&self) -> LeafKind {
        self.leaf_kind
    }

    pub fn root_path(&self) -> Option<&Path> {
        self.node(self.root).map(DefinitionNode::path)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.node(self.root).is_none_or(|r| r.children().is_empty())
    }

    pub fn node(&self, id: NodeId) -> Option<&DefinitionNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut DefinitionNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn live(&self, id: NodeId) -> Result<&DefinitionNode, NodeError> {
        self.node(id).ok_or(NodeError::Stale(id))
    }

    /// Registers a structural listener.
    pub fn add_listener(&mut self, listener: Box<dyn TreeListener>) {
        self.listeners.push(listener);
    }

    // --- Loading ---

    /// Rebuilds the whole tree from disk, creating the root directory if needed.
    pub fn load(&mut self) -> Result<(), NodeError> {
        let root_node = self.live(self.root)?;
        root_node.save()?;
        let root_path = root_node.path().to_path_buf();
        if !root_path.is_dir() {
            return Err(NodeError::NotAFolder {
                path: root_path.display().to_string(),
            });
        }
        log::debug!("Loading definitions from '{}'", root_path.display());

        self.nodes.truncate(1);
        if let Some(root) = self.node_mut(self.root) {
            root.children.clear();
        }

        let mut visited = HashSet::new();
        if let Ok(canonical) = fs::canonicalize(&root_path) {
            visited.insert(canonical);
        }
        self.populate(self.root, &mut visited);
        log::debug!(
            "Loaded {} nodes from '{}'",
            self.len(),
            root_path.display()
        );
        Ok(())
    }

    fn populate(&mut self, parent: NodeId, visited: &mut HashSet<PathBuf>) {
        let Some(parent_path) = self.node(parent).map(|n| n.path().to_path_buf()) else {
            return;
        };
        for entry in scan_directory(&parent_path, self.leaf_kind) {
            let is_folder = entry.is_folder();
            if is_folder {
                // Symlinked directories may point back up the tree.
                let canonical = fs::canonicalize(entry.path()).unwrap_or_else(|_| entry.path().to_path_buf());
                if !visited.insert(canonical) {
                    log::warn!("Skipping '{}': directory already indexed", entry.path().display());
                    continue;
                }
            }
            let id = self.insert(entry, parent);
            if let Some(p) = self.node_mut(parent) {
                p.children.push(id);
            }
            if is_folder {
                self.populate(id, visited);
            }
        }
    }

    fn insert(&mut self, mut node: DefinitionNode, parent: NodeId) -> NodeId {
        node.parent = Some(parent);
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(node));
        id
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut to_free = vec![id];
        while let Some(current) = to_free.pop() {
            if let Some(slot) = self.nodes.get_mut(current.0) {
                if let Some(node) = slot.take() {
                    to_free.extend(node.children);
                }
            }
        }
    }

    /// Lists `id`'s directory and reconciles the result with the in-memory children.
    ///
    /// Returns an empty list for leaves and for folders that are missing or cannot be
    /// listed. Entries still present on disk keep their ids; vanished ones are dropped.
    pub fn get_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let Some(current) = self.node(id) else {
            return Vec::new();
        };
        if !current.is_folder() {
            return Vec::new();
        }
        let scanned = scan_directory(current.path(), self.leaf_kind);
        let previous = self
            .node_mut(id)
            .map(|n| std::mem::take(&mut n.children))
            .unwrap_or_default();

        let mut kept = HashSet::new();
        let mut children = Vec::with_capacity(scanned.len());
        for entry in scanned {
            let existing = previous.iter().copied().find(|c| {
                self.node(*c).is_some_and(|n| {
                    n.path() == entry.path() && n.is_folder() == entry.is_folder()
                })
            });
            match existing {
                Some(child) => {
                    if let Some(n) = self.node_mut(child) {
                        if !entry.is_folder() {
                            *n.data_mut() = entry.data().clone();
                        }
                    }
                    kept.insert(child);
                    children.push(child);
                }
                None => children.push(self.insert(entry, id)),
            }
        }
        for stale in previous.into_iter().filter(|c| !kept.contains(c)) {
            self.free_subtree(stale);
        }
        if let Some(n) = self.node_mut(id) {
            n.children = children.clone();
        }
        children
    }

    /// In-memory children of `id`, without touching the filesystem.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(DefinitionNode::children).unwrap_or(&[])
    }

    // --- Addressing ---

    /// The link path of `id`: `/` + node names from the root, joined by `/`.
    pub fn link_string(&self, id: NodeId) -> Option<String> {
        let mut names = Vec::with_capacity(8);
        let mut current = Some(id);
        while let Some(cid) = current {
            let node = self.node(cid)?;
            names.push(node.name());
            current = node.parent();
        }
        names.reverse();
        Some(format!("/{}", names.join("/")))
    }

    /// Resolves a link path. Absence is ordinary data: `None`, never an error.
    ///
    /// Only the exact form `/root(/segment)*` resolves; a missing leading `/`, doubled
    /// or trailing separators are misses.
    pub fn find_node(&self, link: &str) -> Option<NodeId> {
        let mut segments = link.strip_prefix('/')?.split('/');
        let first = segments.next()?;
        if first.is_empty() || first != self.node(self.root)?.name() {
            return None;
        }
        let mut current = self.root;
        for segment in segments {
            if segment.is_empty() {
                return None;
            }
            current = self
                .children(current)
                .iter()
                .copied()
                .find(|c| self.node(*c).is_some_and(|n| n.name() == segment))?;
        }
        Some(current)
    }

    /// Position of `id` within its parent's children.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.node(id)?.parent()?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Every leaf, in tree order (pre-order, directories first).
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            if node.is_folder() {
                stack.extend(node.children().iter().rev().copied());
            } else {
                out.push(id);
            }
        }
        out
    }

    // --- Mutation ---

    /// Persists `child` and attaches it to `parent`.
    ///
    /// The node is only attached once it has been written, so a failed save leaves the
    /// tree untouched and is returned to the caller.
    pub fn add(&mut self, parent: NodeId, child: DefinitionNode) -> Result<NodeId, NodeError> {
        let parent_node = self.live(parent)?;
        if !parent_node.is_folder() {
            return Err(NodeError::NotAFolder {
                path: parent_node.path().display().to_string(),
            });
        }
        if child.path().parent() != Some(parent_node.path()) {
            return Err(NodeError::ForeignPath {
                child: child.path().display().to_string(),
                parent: parent_node.path().display().to_string(),
            });
        }
        let name_taken = parent_node
            .children()
            .iter()
            .any(|c| self.node(*c).is_some_and(|n| n.name() == child.name()));
        if name_taken {
            return Err(NodeError::NameTaken {
                name: child.name().to_string(),
            });
        }

        parent_node.save()?;
        child.save()?;

        let id = self.insert(child, parent);
        let index = match self.node_mut(parent) {
            Some(p) => {
                p.children.push(id);
                p.children.len() - 1
            }
            None => return Err(NodeError::Stale(parent)),
        };
        log::debug!(
            "Attached '{}' at index {}",
            self.link_string(id).unwrap_or_default(),
            index
        );
        for listener in &self.listeners {
            listener.node_inserted(parent, index);
        }
        Ok(id)
    }

    /// Creates, persists and attaches a folder called `name`.
    pub fn create_folder(&mut self, parent: NodeId, name: &str) -> Result<NodeId, NodeError> {
        validate_name(name)?;
        let path = self.live(parent)?.path().join(name);
        self.add(parent, DefinitionNode::folder(path))
    }

    /// Creates, persists and attaches a leaf called `name`.
    pub fn create_leaf(
        &mut self,
        parent: NodeId,
        name: &str,
        data: NodeData,
    ) -> Result<NodeId, NodeError> {
        validate_name(name)?;
        let path = self.live(parent)?.path().join(node::leaf_file_name(name));
        self.add(parent, DefinitionNode::leaf(path, data))
    }

    /// Removes the backing path of `id` and detaches it from its parent.
    ///
    /// Folders must be empty on disk. On failure the tree is left unchanged.
    pub fn delete(&mut self, id: NodeId) -> Result<(), NodeError> {
        let node = self.live(id)?;
        let parent = node.parent().ok_or(NodeError::RootNode)?;
        let path = node.path().to_path_buf();

        let removal = if node.is_folder() {
            fs::remove_dir(&path)
        } else {
            fs::remove_file(&path)
        };
        match removal {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("'{}' was already gone from disk", path.display());
            }
            Err(e) => {
                return Err(NodeError::Locked {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        }

        let link = self.link_string(id).unwrap_or_default();
        let index = self.index_of(id).unwrap_or_default();
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        self.free_subtree(id);
        log::debug!("Deleted '{}'", link);
        for listener in &self.listeners {
            listener.node_removed(parent, index, &link);
        }
        Ok(())
    }

    /// Writes the current payload of `id` to disk.
    pub fn save(&self, id: NodeId) -> Result<(), NodeError> {
        self.live(id)?.save()
    }

    /// Re-reads the payload of `id` from disk.
    pub fn reload(&mut self, id: NodeId) -> Result<(), NodeError> {
        self.node_mut(id).ok_or(NodeError::Stale(id))?.load()
    }
}

fn validate_name(name: &str) -> Result<(), NodeError> {
    if name == "." || name == ".." || !VALID_NAME.is_match(name) {
        return Err(NodeError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Lists `dir`: directories first, then files, each group sorted by name.
///
/// Returns nothing if `dir` is missing or unreadable. Files that fail to decode are
/// skipped with a warning.
pub fn scan_directory(dir: &Path, kind: LeafKind) -> Vec<DefinitionNode> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cannot list '{}': {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut folders = Vec::new();
    let mut files = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            folders.push(path);
        } else if path.is_file() {
            files.push(path);
        }
    }
    folders.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    files.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));

    let mut nodes: Vec<DefinitionNode> = folders.into_iter().map(DefinitionNode::folder).collect();
    for path in files {
        match DefinitionNode::open_leaf(&path, kind) {
            Ok(leaf) => nodes.push(leaf),
            Err(e) => log::warn!("Skipping unreadable definition '{}': {}", path.display(), e),
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Program;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn program(name: &str) -> NodeData {
        NodeData::Program(Program {
            name: name.to_string(),
            ..Default::default()
        })
    }

    fn names(ds: &DefinitionDataSource, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| ds.node(*id).unwrap().name().to_string())
            .collect()
    }

    #[derive(Default, Clone)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl TreeListener for Recorder {
        fn node_inserted(&self, parent: NodeId, index: usize) {
            self.0.lock().unwrap().push(format!("+{}@{}", parent.0, index));
        }
        fn node_removed(&self, _parent: NodeId, index: usize, link: &str) {
            self.0.lock().unwrap().push(format!("-{}@{}", link, index));
        }
    }

    #[test]
    fn test_children_list_directories_first_then_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("programs");
        fs::create_dir_all(root.join("z")).unwrap();
        fs::create_dir_all(root.join("m")).unwrap();
        fs::write(root.join("b.cfg"), "name=b\n").unwrap();
        fs::write(root.join("a.cfg"), "name=a\n").unwrap();

        let mut ds = DefinitionDataSource::new(&root, LeafKind::Program);
        let children = ds.get_children(ds.root());
        assert_eq!(names(&ds, &children), vec!["m", "z", "a", "b"]);
    }

    #[test]
    fn test_get_children_of_missing_or_leaf_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut ds = DefinitionDataSource::new(dir.path().join("absent"), LeafKind::Library);
        assert!(ds.get_children(ds.root()).is_empty());

        let mut ds = DefinitionDataSource::new(dir.path().join("libs"), LeafKind::Library);
        ds.load().unwrap();
        let leaf = ds
            .create_leaf(ds.root(), "gson", NodeData::Library(Default::default()))
            .unwrap();
        assert!(ds.get_children(leaf).is_empty());
    }

    #[test]
    fn test_get_children_preserves_ids_and_drops_vanished_entries() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("programs");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("keep.cfg"), "name=keep\n").unwrap();
        fs::write(root.join("gone.cfg"), "name=gone\n").unwrap();

        let mut ds = DefinitionDataSource::new(&root, LeafKind::Program);
        ds.load().unwrap();
        let keep = ds.find_node("/programs/keep").unwrap();
        let gone = ds.find_node("/programs/gone").unwrap();

        fs::remove_file(root.join("gone.cfg")).unwrap();
        fs::write(root.join("keep.cfg"), "name=kept\n").unwrap();
        fs::write(root.join("new.cfg"), "name=new\n").unwrap();

        let children = ds.get_children(ds.root());
        assert_eq!(names(&ds, &children), vec!["keep", "new"]);
        assert_eq!(children[0], keep);
        assert!(ds.node(gone).is_none());
        let refreshed = ds.node(keep).unwrap().data().as_program().unwrap();
        assert_eq!(refreshed.name, "kept");
    }

    #[test]
    fn test_malformed_leaf_is_skipped_during_scan() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("libs");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("good.cfg"), "path=/opt/good.jar\n").unwrap();
        fs::write(root.join("bad.cfg"), "this line has no separator\n").unwrap();

        let mut ds = DefinitionDataSource::new(&root, LeafKind::Library);
        ds.load().unwrap();
        assert_eq!(names(&ds, ds.children(ds.root())), vec!["good"]);
    }

    #[test]
    fn test_link_strings_compose_and_resolve() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("programs");
        fs::create_dir_all(root.join("tools").join("net")).unwrap();
        fs::write(root.join("tools").join("net").join("curl.cfg"), "name=curl\n").unwrap();
        fs::write(root.join("editor.cfg"), "name=editor\n").unwrap();

        let mut ds = DefinitionDataSource::new(&root, LeafKind::Program);
        ds.load().unwrap();

        assert_eq!(ds.link_string(ds.root()).unwrap(), "/programs");
        let mut stack = vec![ds.root()];
        let mut visited = 0;
        while let Some(id) = stack.pop() {
            visited += 1;
            let link = ds.link_string(id).unwrap();
            assert_eq!(ds.find_node(&link), Some(id), "lookup of {link}");
            if let Some(parent) = ds.node(id).unwrap().parent() {
                let expected = format!(
                    "{}/{}",
                    ds.link_string(parent).unwrap(),
                    ds.node(id).unwrap().name()
                );
                assert_eq!(link, expected);
            }
            stack.extend(ds.children(id).iter().copied());
        }
        assert_eq!(visited, 5);
        assert_eq!(
            ds.link_string(ds.find_node("/programs/tools/net/curl").unwrap()).unwrap(),
            "/programs/tools/net/curl"
        );
    }

    #[test]
    fn test_find_node_misses() {
        let dir = TempDir::new().unwrap();
        let mut ds = DefinitionDataSource::new(dir.path().join("programs"), LeafKind::Program);
        ds.load().unwrap();
        ds.create_leaf(ds.root(), "app", program("app")).unwrap();

        assert_eq!(ds.find_node(""), None);
        assert_eq!(ds.find_node("/"), None);
        assert_eq!(ds.find_node("/libs/app"), None);
        assert_eq!(ds.find_node("/programs/missing"), None);
        assert_eq!(ds.find_node("/programs/app/deeper"), None);
        assert!(ds.find_node("/programs/app").is_some());
        assert_eq!(ds.find_node("/programs"), Some(ds.root()));
    }

    #[test]
    fn test_find_node_requires_exact_link_form() {
        let dir = TempDir::new().unwrap();
        let mut ds = DefinitionDataSource::new(dir.path().join("programs"), LeafKind::Program);
        ds.load().unwrap();
        let app = ds.create_leaf(ds.root(), "app", program("app")).unwrap();

        assert_eq!(ds.find_node("/programs/app"), Some(app));
        assert_eq!(ds.find_node("programs/app"), None);
        assert_eq!(ds.find_node("//programs/app"), None);
        assert_eq!(ds.find_node("/programs//app"), None);
        assert_eq!(ds.find_node("/programs/app/"), None);
        assert_eq!(ds.find_node("/programs/"), None);
    }

    #[test]
    fn test_add_persists_notifies_and_sets_parent() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("programs");
        let mut ds = DefinitionDataSource::new(&root, LeafKind::Program);
        let recorder = Recorder::default();
        ds.add_listener(Box::new(recorder.clone()));

        let folder = ds.create_folder(ds.root(), "games").unwrap();
        let leaf = ds.create_leaf(folder, "chess", program("chess")).unwrap();

        assert!(root.join("games").join("chess.cfg").is_file());
        assert_eq!(ds.node(leaf).unwrap().parent(), Some(folder));
        assert_eq!(ds.index_of(leaf), Some(0));
        assert_eq!(ds.children(folder), &[leaf]);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["+0@0".to_string(), format!("+{}@0", folder.0)]
        );

        // A fresh load sees the same structure.
        let mut reloaded = DefinitionDataSource::new(&root, LeafKind::Program);
        reloaded.load().unwrap();
        let found = reloaded.find_node("/programs/games/chess").unwrap();
        assert_eq!(
            reloaded.node(found).unwrap().data().as_program().unwrap().name,
            "chess"
        );
    }

    #[test]
    fn test_add_rejects_duplicates_bad_names_and_leaf_parents() {
        let dir = TempDir::new().unwrap();
        let mut ds = DefinitionDataSource::new(dir.path().join("programs"), LeafKind::Program);
        let leaf = ds.create_leaf(ds.root(), "app", program("app")).unwrap();

        assert!(matches!(
            ds.create_leaf(ds.root(), "app", program("again")),
            Err(NodeError::NameTaken { .. })
        ));
        assert!(matches!(
            ds.create_folder(ds.root(), "a/b"),
            Err(NodeError::InvalidName { .. })
        ));
        assert!(matches!(
            ds.create_folder(ds.root(), ".."),
            Err(NodeError::InvalidName { .. })
        ));
        assert!(matches!(
            ds.create_folder(leaf, "sub"),
            Err(NodeError::NotAFolder { .. })
        ));
        let stray = DefinitionNode::folder(dir.path().join("elsewhere"));
        assert!(matches!(
            ds.add(ds.root(), stray),
            Err(NodeError::ForeignPath { .. })
        ));
        assert_eq!(ds.children(ds.root()).len(), 1);
    }

    #[test]
    fn test_failed_persistence_leaves_tree_untouched() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("programs");
        let mut ds = DefinitionDataSource::new(&root, LeafKind::Program);
        ds.load().unwrap();
        // A directory squatting on the leaf's file name makes the write fail.
        fs::create_dir_all(root.join("app.cfg")).unwrap();

        let result = ds.create_leaf(ds.root(), "app", program("app"));
        assert!(result.is_err());
        assert!(ds.children(ds.root()).is_empty());
    }

    #[test]
    fn test_delete_leaf_and_empty_folder() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("programs");
        let mut ds = DefinitionDataSource::new(&root, LeafKind::Program);
        let recorder = Recorder::default();
        ds.add_listener(Box::new(recorder.clone()));
        let folder = ds.create_folder(ds.root(), "tools").unwrap();
        let leaf = ds.create_leaf(folder, "grep", program("grep")).unwrap();

        ds.delete(leaf).unwrap();
        assert!(!root.join("tools").join("grep.cfg").exists());
        assert!(ds.children(folder).is_empty());
        assert!(ds.node(leaf).is_none());

        ds.delete(folder).unwrap();
        assert!(!root.join("tools").exists());
        assert!(ds.children(ds.root()).is_empty());
        let events = recorder.0.lock().unwrap();
        assert_eq!(events[2], "-/programs/tools/grep@0");
        assert_eq!(events[3], "-/programs/tools@0");
    }

    #[test]
    fn test_delete_non_empty_folder_fails_and_keeps_children() {
        let dir = TempDir::new().unwrap();
        let mut ds = DefinitionDataSource::new(dir.path().join("programs"), LeafKind::Program);
        let folder = ds.create_folder(ds.root(), "tools").unwrap();
        ds.create_leaf(folder, "grep", program("grep")).unwrap();
        let before = ds.children(ds.root()).to_vec();

        let err = ds.delete(folder).unwrap_err();
        assert!(matches!(err, NodeError::Locked { .. }));
        assert!(err.to_string().contains("locked or non-empty"));
        assert_eq!(ds.children(ds.root()), before.as_slice());
        assert!(matches!(ds.delete(ds.root()), Err(NodeError::RootNode)));
    }

    #[test]
    fn test_leaves_follow_tree_order() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("libs");
        fs::create_dir_all(root.join("net")).unwrap();
        fs::write(root.join("net").join("okhttp.cfg"), "path=okhttp.jar\n").unwrap();
        fs::write(root.join("foo.cfg"), "path=foo.jar\n").unwrap();
        fs::write(root.join("bar.cfg"), "path=bar.jar\n").unwrap();

        let mut ds = DefinitionDataSource::new(&root, LeafKind::Library);
        ds.load().unwrap();
        let leaves = ds.leaves();
        assert_eq!(names(&ds, &leaves), vec!["okhttp", "bar", "foo"]);
    }

    #[test]
    fn test_save_and_reload_single_leaf() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("programs");
        let mut ds = DefinitionDataSource::new(&root, LeafKind::Program);
        let id = ds.create_leaf(ds.root(), "app", program("app")).unwrap();

        if let Some(NodeData::Program(p)) = ds.node_mut(id).map(DefinitionNode::data_mut) {
            p.version = "2.0".to_string();
        }
        ds.save(id).unwrap();
        fs::write(root.join("app.cfg"), "name=app\nversion=3.0\n").unwrap();
        ds.reload(id).unwrap();
        assert_eq!(
            ds.node(id).unwrap().data().as_program().unwrap().version,
            "3.0"
        );
    }
}
