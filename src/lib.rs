pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;

pub use crate::core::data_source::DefinitionDataSource;
pub use crate::core::node::{DefinitionNode, NodeError, NodeId};
pub use crate::core::registry::{LaunchSpec, Registry, RegistryError};
pub use crate::models::{LeafKind, Library, NodeData, NodeKind, Program, RuntimeDefinition};
pub use crate::system::events::{EventListener, EventsDispatcher};
pub use crate::system::process::ManagedProcess;
pub use crate::system::runtime_manager::{RuntimeEvent, RuntimeManager};
pub use crate::system::task::{Task, TaskError, TaskInfo};
