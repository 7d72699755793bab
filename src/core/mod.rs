//! # Definition Layer
//!
//! Persistence and resolution of the registry's definitions.
//!
//! ## Modules
//!
//! - **`properties`**: Reader/writer for the `key=value` files backing every leaf.
//! - **`node`**: `DefinitionNode`, one file or directory of the hierarchy.
//! - **`data_source`**: A live, path-addressable index over one directory subtree.
//! - **`registry`**: The three data sources and the invocation builder.
//! - **`host_runtime`**: Describes the host's runtime for the default definition.
//! - **`paths`** / **`settings`**: Base directory resolution and `defreg.toml`.

pub mod commons;
pub mod data_source;
pub mod host_runtime;
pub mod node;
pub mod paths;
pub mod properties;
pub mod registry;
pub mod settings;
