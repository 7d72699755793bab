// src/core/node.rs

use crate::constants::{LEAF_HEADER, LEAF_SUFFIX};
use crate::core::properties::{self, PropertiesError};
use crate::models::{LeafKind, NodeData, NodeKind};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Handle of a node inside its data source. Never dereferenced across sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Represents errors raised by node and tree operations.
#[derive(Error, Debug)]
pub enum NodeError {
    /// A filesystem I/O error occurred.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// A leaf file could not be read or written.
    #[error("Definition file error: {0}")]
    Properties(#[from] PropertiesError),
    /// The backing path could not be removed.
    #[error("Cannot delete '{path}': locked or non-empty ({source})")]
    Locked {
        /// The path that could not be removed.
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The root of a data source cannot be deleted or re-parented.
    #[error("The root node cannot be deleted.")]
    RootNode,
    /// A sibling with the same name already exists.
    #[error("Name '{name}' is already in use by another child of the same folder.")]
    NameTaken {
        /// The conflicting name.
        name: String,
    },
    /// The name cannot be used as a node name.
    #[error("'{name}' is not a valid node name.")]
    InvalidName {
        /// The rejected name.
        name: String,
    },
    /// The handle does not refer to a live node.
    #[error("Node {0:?} does not exist in this data source.")]
    Stale(NodeId),
    /// Children can only be attached to folders.
    #[error("'{path}' is not a folder.")]
    NotAFolder {
        /// Backing path of the offending node.
        path: String,
    },
    /// The child's backing path does not live directly inside the parent folder.
    #[error("'{child}' is not located inside '{parent}'.")]
    ForeignPath {
        /// Backing path of the child.
        child: String,
        /// Backing path of the parent.
        parent: String,
    },
}

/// One entry of the definition hierarchy, backed 1:1 by a file (leaf) or a
/// directory (folder).
#[derive(Debug, Clone)]
pub struct DefinitionNode {
    path: PathBuf,
    name: String,
    data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl DefinitionNode {
    /// Creates a folder node. Nothing is written until [`save`](Self::save).
    pub fn folder(path: impl Into<PathBuf>) -> Self {
        Self::detached(path.into(), NodeData::Folder)
    }

    /// Creates a leaf node carrying `data`. Nothing is written until
    /// [`save`](Self::save).
    pub fn leaf(path: impl Into<PathBuf>, data: NodeData) -> Self {
        Self::detached(path.into(), data)
    }

    /// Reads the leaf file at `path` and decodes it as `kind`.
    pub fn open_leaf(path: impl Into<PathBuf>, kind: LeafKind) -> Result<Self, NodeError> {
        let path = path.into();
        let props = properties::load(&path)?;
        let data = NodeData::decode(kind, props)?;
        Ok(Self::detached(path, data))
    }

    fn detached(path: PathBuf, data: NodeData) -> Self {
        let name = node_name_for(&path, matches!(data, NodeData::Folder));
        Self {
            path,
            name,
            data,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The node name: file name with the leaf suffix stripped.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut NodeData {
        &mut self.data
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children attached in memory, directories first.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.data, NodeData::Folder)
    }

    /// True iff the backing path is a directory that can be listed.
    pub fn is_expandable(&self) -> bool {
        self.path.is_dir() && fs::read_dir(&self.path).is_ok()
    }

    /// Re-reads the backing file. A no-op for folders.
    pub fn load(&mut self) -> Result<(), NodeError> {
        let Some(kind) = self.data.leaf_kind() else {
            return Ok(());
        };
        let props = properties::load(&self.path)?;
        self.data = NodeData::decode(kind, props)?;
        Ok(())
    }

    /// Persists the node. Folders create their directory if it is missing.
    pub fn save(&self) -> Result<(), NodeError> {
        match self.data.encode()? {
            None => {
                if !self.path.exists() {
                    log::debug!("Creating folder '{}'", self.path.display());
                    fs::create_dir_all(&self.path)?;
                }
            }
            Some(props) => {
                properties::store(&props, LEAF_HEADER, &self.path)?;
                log::debug!("Saved definition '{}'", self.path.display());
            }
        }
        Ok(())
    }
}

/// Derives the node name of `path`. Leaf names lose the registry suffix.
pub fn node_name_for(path: &Path, is_folder: bool) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if is_folder {
        return file_name;
    }
    match file_name.strip_suffix(LEAF_SUFFIX) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => file_name,
    }
}

/// Backing file name of a leaf called `name`.
pub fn leaf_file_name(name: &str) -> String {
    format!("{name}{LEAF_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Library;
    use tempfile::TempDir;

    #[test]
    fn test_leaf_name_strips_suffix() {
        assert_eq!(node_name_for(Path::new("/x/foo.cfg"), false), "foo");
        assert_eq!(node_name_for(Path::new("/x/notes.txt"), false), "notes.txt");
        assert_eq!(node_name_for(Path::new("/x/.cfg"), false), ".cfg");
        assert_eq!(node_name_for(Path::new("/x/dir.cfg"), true), "dir.cfg");
    }

    #[test]
    fn test_folder_save_creates_directory_lazily() {
        let dir = TempDir::new().unwrap();
        let folder = DefinitionNode::folder(dir.path().join("a").join("b"));
        assert!(!folder.is_expandable());
        folder.save().unwrap();
        assert!(folder.is_expandable());
        // Saving again is harmless.
        folder.save().unwrap();
    }

    #[test]
    fn test_leaf_save_then_open_round_trips_payload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(leaf_file_name("gson"));
        let library = Library {
            name: "gson".to_string(),
            path: "/opt/gson.jar".to_string(),
            ..Default::default()
        };
        let node = DefinitionNode::leaf(&path, NodeData::Library(library.clone()));
        node.save().unwrap();

        let reopened = DefinitionNode::open_leaf(&path, LeafKind::Library).unwrap();
        assert_eq!(reopened.name(), "gson");
        assert_eq!(reopened.data().as_library(), Some(&library));
        assert!(!reopened.is_expandable());
    }

    #[test]
    fn test_leaf_load_picks_up_external_edits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jdk.cfg");
        fs::write(&path, "path=/usr/bin/java\n").unwrap();
        let mut node = DefinitionNode::open_leaf(&path, LeafKind::Runtime).unwrap();

        fs::write(&path, "path=/opt/jdk/bin/java\nversion=21\n").unwrap();
        node.load().unwrap();

        let runtime = node.data().as_runtime().unwrap();
        assert_eq!(runtime.path, "/opt/jdk/bin/java");
        assert_eq!(runtime.version, "21");
    }
}
