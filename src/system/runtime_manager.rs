// src/system/runtime_manager.rs

use crate::constants::{EVENT_AFTER_EXECUTE, EVENT_BEFORE_EXECUTE};
use crate::core::registry::LaunchSpec;
use crate::core::settings::PoolSettings;
use crate::system::events::EventsDispatcher;
use crate::system::pool::{ExecutionHooks, PoolError, WorkerInfo, WorkerPool};
use crate::system::process::ManagedProcess;
use crate::system::task::{Task, TaskError, TaskRef};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Payload of the lifecycle events fired around every pooled task.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Code 1000: a thread is about to run `task`.
    BeforeExecute { worker: WorkerInfo, task: TaskRef },
    /// Code 1001: `task` has finished; `error` is set if it failed.
    AfterExecute {
        task: TaskRef,
        error: Option<Arc<TaskError>>,
    },
}

impl RuntimeEvent {
    pub fn code(&self) -> i32 {
        match self {
            Self::BeforeExecute { .. } => EVENT_BEFORE_EXECUTE,
            Self::AfterExecute { .. } => EVENT_AFTER_EXECUTE,
        }
    }

    pub fn task(&self) -> &TaskRef {
        match self {
            Self::BeforeExecute { task, .. } | Self::AfterExecute { task, .. } => task,
        }
    }
}

/// Forwards pool hooks to an events dispatcher.
#[derive(Debug)]
pub struct DispatchHooks {
    events: Arc<EventsDispatcher<RuntimeEvent>>,
}

impl ExecutionHooks for DispatchHooks {
    fn before_execute(&self, worker: &WorkerInfo, task: &TaskRef) {
        let event = RuntimeEvent::BeforeExecute {
            worker: worker.clone(),
            task: task.clone(),
        };
        self.events.fire_event(event.code(), &event);
    }

    fn after_execute(&self, task: &TaskRef, error: Option<&Arc<TaskError>>) {
        let event = RuntimeEvent::AfterExecute {
            task: task.clone(),
            error: error.cloned(),
        };
        self.events.fire_event(event.code(), &event);
    }
}

/// Runs programs and other background work on a bounded pool, publishing
/// before/after-execute events for each task.
#[derive(Debug)]
pub struct RuntimeManager {
    pool: WorkerPool<DispatchHooks>,
    events: Arc<EventsDispatcher<RuntimeEvent>>,
}

impl RuntimeManager {
    pub fn new(settings: &PoolSettings) -> Self {
        let events = Arc::new(EventsDispatcher::new());
        let hooks = DispatchHooks {
            events: events.clone(),
        };
        log::debug!(
            "Runtime manager ready (core {}, max {}, keep-alive {}s, {:?}).",
            settings.core_size,
            settings.max_size,
            settings.keep_alive_secs,
            settings.saturation
        );
        Self {
            pool: WorkerPool::new(settings.clone(), hooks),
            events,
        }
    }

    /// Lifecycle events: subscribe with code 1000 or 1001.
    pub fn events(&self) -> &Arc<EventsDispatcher<RuntimeEvent>> {
        &self.events
    }

    /// Submits a unit of work.
    pub fn take(&self, task: TaskRef) -> Result<(), RuntimeError> {
        log::debug!("Submitting task '{}' ({}).", task.name(), task.info().id());
        self.pool.execute(task)?;
        Ok(())
    }

    /// Parses `command` into a process, submits it and returns its handle.
    pub fn run(&self, command: &str) -> Result<Arc<ManagedProcess>, RuntimeError> {
        let process = Arc::new(ManagedProcess::from_command(command)?);
        self.take(process.clone())?;
        Ok(process)
    }

    /// Submits the process described by a resolved launch spec.
    pub fn launch(
        &self,
        name: &str,
        spec: &LaunchSpec,
    ) -> Result<Arc<ManagedProcess>, RuntimeError> {
        let process = Arc::new(spec.to_process(name)?);
        self.take(process.clone())?;
        Ok(process)
    }

    pub fn active_count(&self) -> usize {
        self.pool.active_count()
    }

    pub fn queued_tasks(&self) -> usize {
        self.pool.queued_tasks()
    }

    pub fn pool_size(&self) -> usize {
        self.pool.pool_size()
    }

    /// Stops accepting work. Queued and running tasks, including running
    /// processes, are left to finish; use `ManagedProcess::kill` to stop one.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    pub fn await_termination(&self, timeout: Duration) -> bool {
        self.pool.await_termination(timeout)
    }
}
