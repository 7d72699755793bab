// src/system/task.rs

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Command could not be parsed: {0}")]
    CommandParse(String),
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{command}' could not be executed: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Lost track of process '{name}': {source}")]
    Wait {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Command '{name}' exited with a non-zero status ({code:?}).")]
    NonZeroExit { name: String, code: Option<i32> },
    #[error("Task '{0}' was killed.")]
    Killed(String),
    #[error("Task '{name}' failed: {message}")]
    Failed { name: String, message: String },
    #[error("Task '{name}' panicked: {message}")]
    Panicked { name: String, message: String },
}

/// Destination of a task's captured output.
pub trait LogSink: Send + Sync + fmt::Debug {
    fn write(&self, text: &str);
}

/// An in-memory log buffer.
#[derive(Debug, Default)]
pub struct MemoryLog {
    buffer: Mutex<String>,
}

impl MemoryLog {
    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemoryLog {
    fn write(&self, text: &str) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_str(text);
    }
}

/// Identity, clock and log shared by every task.
#[derive(Debug)]
pub struct TaskInfo {
    id: Uuid,
    name: String,
    started: OnceLock<Instant>,
    log: Arc<dyn LogSink>,
}

impl TaskInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_sink(name, Arc::new(MemoryLog::default()))
    }

    pub fn with_sink(name: impl Into<String>, log: Arc<dyn LogSink>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            started: OnceLock::new(),
            log,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log(&self) -> &Arc<dyn LogSink> {
        &self.log
    }

    /// Records the start time. Later calls keep the first value.
    pub fn mark_started(&self) {
        let _ = self.started.set(Instant::now());
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started.get().copied()
    }

    /// Whole seconds since the task started; `None` before it has begun running.
    pub fn elapsed_seconds(&self) -> Option<u64> {
        self.started_at().map(|s| s.elapsed().as_secs())
    }
}

/// A named, timed unit of supervised work.
pub trait Task: Send + Sync + fmt::Debug {
    fn info(&self) -> &TaskInfo;

    /// Runs the task body on the calling thread.
    fn run(&self) -> Result<(), TaskError>;

    fn name(&self) -> &str {
        self.info().name()
    }

    fn elapsed_seconds(&self) -> Option<u64> {
        self.info().elapsed_seconds()
    }

    fn log(&self) -> &Arc<dyn LogSink> {
        self.info().log()
    }
}

/// Shared handle to a task, as held by the pool and by callers.
pub type TaskRef = Arc<dyn Task>;

type TaskBody = Box<dyn Fn(&TaskInfo) -> Result<(), TaskError> + Send + Sync>;

/// Background work expressed as a closure.
pub struct FnTask {
    info: TaskInfo,
    body: TaskBody,
}

impl FnTask {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&TaskInfo) -> Result<(), TaskError> + Send + Sync + 'static,
    {
        Self {
            info: TaskInfo::new(name),
            body: Box::new(body),
        }
    }
}

impl fmt::Debug for FnTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask").field("info", &self.info).finish()
    }
}

impl Task for FnTask {
    fn info(&self) -> &TaskInfo {
        &self.info
    }

    fn run(&self) -> Result<(), TaskError> {
        self.info.mark_started();
        (self.body)(&self.info)
    }
}
