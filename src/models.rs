// src/models.rs

use crate::core::properties::{Properties, PropertiesError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- LEAF PAYLOADS ---
// Every leaf definition is stored as a flat key/value file. The structs below
// give the known keys a typed home; anything else survives in `extra`.

/// A runnable program.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Program {
    pub name: String,
    pub version: String,
    /// Path of the program's own archive, appended last to the dependency path.
    pub archive: String,
    pub source: String,
    /// Link path of the runtime definition used to launch the program.
    pub runtime: String,
    /// Entry-point identifier substituted for the `%m` placeholder.
    pub main: String,
    /// Extra arguments, split on whitespace when substituted for `%a`.
    pub arguments: String,
    /// Comma-joined link paths of the libraries the program depends on.
    pub libraries: String,
    pub description: String,
    pub workdir: String,
    pub docs: String,
    #[serde(flatten)]
    pub extra: Properties,
}

/// A shared library.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Library {
    pub name: String,
    pub version: String,
    /// Path of the library archive, as it should appear in a dependency path.
    pub path: String,
    pub source: String,
    pub description: String,
    pub docs: String,
    #[serde(flatten)]
    pub extra: Properties,
}

/// A runtime environment able to launch programs.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeDefinition {
    pub name: String,
    /// Path of the runtime executable; first element of every invocation.
    pub path: String,
    pub version: String,
    /// Whitespace-tokenized argument template (`-cp %c %m %a`).
    pub arguments: String,
    pub description: String,
    #[serde(flatten)]
    pub extra: Properties,
}

/// Decodes a payload from key/value content. Keys without a typed field land in
/// the payload's `extra` map.
fn from_properties<T: DeserializeOwned>(props: Properties) -> Result<T, PropertiesError> {
    let object: Map<String, Value> = props
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    Ok(serde_json::from_value(Value::Object(object))?)
}

/// Encodes a payload as key/value content. Empty fields are not written.
fn to_properties<T: Serialize>(payload: &T) -> Result<Properties, PropertiesError> {
    let Value::Object(object) = serde_json::to_value(payload)? else {
        return Ok(Properties::new());
    };
    Ok(object
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(text) if !text.is_empty() => Some((key, text)),
            _ => None,
        })
        .collect())
}

impl Program {
    /// Splits the comma-joined library field into trimmed, non-empty link paths.
    pub fn library_links(&self) -> Vec<&str> {
        self.libraries
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Replaces the library field with the given link paths.
    pub fn set_library_links<S: AsRef<str>>(&mut self, links: &[S]) {
        self.libraries = links
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(",");
    }
}

// --- NODE VARIANTS ---

/// Kind of leaf a data source builds from the files it scans.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum LeafKind {
    Program,
    Library,
    Runtime,
}

/// Neutral classification of a node, for presentation layers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Folder,
    Program,
    Library,
    Runtime,
}

/// The payload carried by a definition node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NodeData {
    Folder,
    Program(Program),
    Library(Library),
    Runtime(RuntimeDefinition),
}

impl NodeData {
    /// Decodes a leaf of the given kind from its key/value content.
    pub fn decode(kind: LeafKind, props: Properties) -> Result<Self, PropertiesError> {
        Ok(match kind {
            LeafKind::Program => Self::Program(from_properties(props)?),
            LeafKind::Library => Self::Library(from_properties(props)?),
            LeafKind::Runtime => Self::Runtime(from_properties(props)?),
        })
    }

    /// Encodes the payload as key/value content. `None` for folders.
    pub fn encode(&self) -> Result<Option<Properties>, PropertiesError> {
        let props = match self {
            Self::Folder => return Ok(None),
            Self::Program(p) => to_properties(p)?,
            Self::Library(l) => to_properties(l)?,
            Self::Runtime(r) => to_properties(r)?,
        };
        Ok(Some(props))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Folder => NodeKind::Folder,
            Self::Program(_) => NodeKind::Program,
            Self::Library(_) => NodeKind::Library,
            Self::Runtime(_) => NodeKind::Runtime,
        }
    }

    pub fn leaf_kind(&self) -> Option<LeafKind> {
        match self {
            Self::Folder => None,
            Self::Program(_) => Some(LeafKind::Program),
            Self::Library(_) => Some(LeafKind::Library),
            Self::Runtime(_) => Some(LeafKind::Runtime),
        }
    }

    pub fn as_program(&self) -> Option<&Program> {
        match self {
            Self::Program(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_library(&self) -> Option<&Library> {
        match self {
            Self::Library(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_runtime(&self) -> Option<&RuntimeDefinition> {
        match self {
            Self::Runtime(r) => Some(r),
            _ => None,
        }
    }
}
