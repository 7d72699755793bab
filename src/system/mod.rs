//! # Supervised Execution Layer
//!
//! Runs resolved invocations as background tasks and reports on their lifecycle.
//!
//! ## Modules
//!
//! - **`task`**: The `Task` trait, shared task identity/clock/log, and closure tasks.
//! - **`process`**: `ManagedProcess`, an OS process supervised as a task. It can be
//!   killed from any thread while a pool worker waits on it.
//! - **`log_reader`**: Background threads tailing a process's output into its log in
//!   fixed-size, time-prefixed chunks.
//! - **`pool`**: A bounded worker pool with injected before/after execution hooks and
//!   an explicit saturation policy.
//! - **`events`**: Thread-safe pub/sub keyed by exact integer event codes.
//! - **`runtime_manager`**: Ties the pool to the dispatcher, firing codes 1000 and 1001.

pub mod events;
pub mod log_reader;
pub mod pool;
pub mod process;
pub mod runtime_manager;
pub mod task;
