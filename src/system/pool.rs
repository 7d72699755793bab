// src/system/pool.rs

use crate::core::settings::{PoolSettings, SaturationPolicy};
use crate::system::task::{Task, TaskError, TaskRef};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use scopeguard::defer;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("The pool has been shut down and accepts no new tasks.")]
    ShutDown,
    #[error("The pool is saturated; task '{0}' was rejected.")]
    Saturated(String),
    #[error("Could not start a worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Identifies the thread a task runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInfo {
    pub name: String,
    /// `None` when the task runs on the submitting thread.
    pub index: Option<usize>,
}

/// Callbacks wrapped around every task the pool runs.
///
/// Both hooks run synchronously on the thread executing the task, so slow hooks
/// delay that thread's next task.
pub trait ExecutionHooks: Send + Sync + 'static {
    fn before_execute(&self, _worker: &WorkerInfo, _task: &TaskRef) {}

    /// Called once per task, whether it succeeded, failed or panicked.
    fn after_execute(&self, _task: &TaskRef, _error: Option<&Arc<TaskError>>) {}
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl ExecutionHooks for NoHooks {}

#[derive(Debug)]
struct PoolState {
    workers: usize,
    next_index: usize,
    sender: Option<Sender<TaskRef>>,
}

struct Shared<H> {
    hooks: H,
    settings: PoolSettings,
    receiver: Receiver<TaskRef>,
    state: Mutex<PoolState>,
    terminated: Condvar,
    active: AtomicUsize,
    completed: AtomicUsize,
}

/// A bounded thread pool with a core size, a maximum size, an idle keep-alive
/// for threads above the core, and a queue holding up to `max_size` tasks.
///
/// New tasks start a thread while fewer than `core_size` exist, then go to the
/// queue, then start extra threads up to `max_size`. Past that the configured
/// [`SaturationPolicy`] applies.
pub struct WorkerPool<H: ExecutionHooks = NoHooks> {
    shared: Arc<Shared<H>>,
}

impl<H: ExecutionHooks> fmt::Debug for WorkerPool<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("settings", &self.shared.settings)
            .field("pool_size", &self.pool_size())
            .field("active", &self.active_count())
            .field("queued", &self.queued_tasks())
            .finish()
    }
}

impl<H: ExecutionHooks> WorkerPool<H> {
    pub fn new(settings: PoolSettings, hooks: H) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(settings.max_size.max(1));
        Self {
            shared: Arc::new(Shared {
                hooks,
                settings,
                receiver,
                state: Mutex::new(PoolState {
                    workers: 0,
                    next_index: 0,
                    sender: Some(sender),
                }),
                terminated: Condvar::new(),
                active: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
            }),
        }
    }

    pub fn hooks(&self) -> &H {
        &self.shared.hooks
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.shared.settings
    }

    /// Submits a task for execution.
    pub fn execute(&self, task: TaskRef) -> Result<(), PoolError> {
        let settings = &self.shared.settings;
        let mut state = self.shared.lock_state();
        let Some(sender) = state.sender.clone() else {
            return Err(PoolError::ShutDown);
        };

        if state.workers < settings.core_size {
            return Shared::spawn_worker(&self.shared, &mut state, Some(task));
        }

        let rejected = match sender.try_send(task) {
            Ok(()) => {
                if state.workers == 0 {
                    Shared::spawn_worker(&self.shared, &mut state, None)?;
                }
                return Ok(());
            }
            Err(TrySendError::Disconnected(_)) => return Err(PoolError::ShutDown),
            Err(TrySendError::Full(task)) => task,
        };

        if state.workers < settings.max_size {
            return Shared::spawn_worker(&self.shared, &mut state, Some(rejected));
        }
        drop(state);

        match settings.saturation {
            SaturationPolicy::Reject => {
                log::warn!("Pool saturated; rejecting task '{}'.", rejected.name());
                Err(PoolError::Saturated(rejected.name().to_string()))
            }
            SaturationPolicy::CallerRuns => {
                log::debug!(
                    "Pool saturated; running task '{}' on the caller.",
                    rejected.name()
                );
                let caller = WorkerInfo {
                    name: thread::current().name().unwrap_or("caller").to_string(),
                    index: None,
                };
                self.shared.run_task(&caller, &rejected);
                Ok(())
            }
        }
    }

    /// Tasks currently executing.
    pub fn active_count(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Tasks waiting in the queue.
    pub fn queued_tasks(&self) -> usize {
        self.shared.receiver.len()
    }

    /// Live worker threads.
    pub fn pool_size(&self) -> usize {
        self.shared.lock_state().workers
    }

    /// Tasks that have finished, successfully or not.
    pub fn completed_tasks(&self) -> usize {
        self.shared.completed.load(Ordering::SeqCst)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.lock_state().sender.is_none()
    }

    /// Stops accepting new tasks. Queued and running tasks still complete.
    pub fn shutdown(&self) {
        let mut state = self.shared.lock_state();
        if state.sender.take().is_some() {
            log::debug!(
                "Pool shutting down with {} queued task(s).",
                self.shared.receiver.len()
            );
        }
        if state.workers == 0 {
            self.shared.terminated.notify_all();
        }
    }

    /// Blocks until every worker has exited after [`shutdown`](Self::shutdown),
    /// or until `timeout` elapses. Returns `true` if the pool terminated.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock_state();
        while state.sender.is_some() || state.workers > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .shared
                .terminated
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

impl<H: ExecutionHooks> Drop for WorkerPool<H> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<H: ExecutionHooks> Shared<H> {
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_worker(
        shared: &Arc<Self>,
        state: &mut PoolState,
        first: Option<TaskRef>,
    ) -> Result<(), PoolError> {
        let index = state.next_index;
        let worker = WorkerInfo {
            name: format!("defreg-worker-{index}"),
            index: Some(index),
        };
        let pool = Arc::clone(shared);
        thread::Builder::new()
            .name(worker.name.clone())
            .spawn(move || pool.work(worker, first))?;
        state.next_index += 1;
        state.workers += 1;
        log::trace!("Started worker {} ({} live).", index, state.workers);
        Ok(())
    }

    fn work(&self, worker: WorkerInfo, first: Option<TaskRef>) {
        let mut next = first;
        loop {
            let task = match next.take() {
                Some(task) => task,
                None => match self.next_task() {
                    Some(task) => task,
                    None => break,
                },
            };
            self.run_task(&worker, &task);
        }
        log::trace!("Worker '{}' exiting.", worker.name);
    }

    /// Waits for the next queued task. Returns `None` once this worker has been
    /// retired, either because the queue closed or because it idled past the
    /// keep-alive while the pool was above its core size.
    fn next_task(&self) -> Option<TaskRef> {
        loop {
            let may_retire = self.lock_state().workers > self.settings.core_size;
            let received = if may_retire {
                self.receiver.recv_timeout(self.settings.keep_alive())
            } else {
                self.receiver
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected)
            };
            match received {
                Ok(task) => return Some(task),
                Err(RecvTimeoutError::Disconnected) => {
                    self.retire(&mut self.lock_state());
                    return None;
                }
                Err(RecvTimeoutError::Timeout) => {
                    // Submissions enqueue under the state lock, so an empty queue seen
                    // here cannot gain a task that expects this worker to pick it up.
                    let mut state = self.lock_state();
                    if state.workers > self.settings.core_size && self.receiver.is_empty() {
                        self.retire(&mut state);
                        return None;
                    }
                }
            }
        }
    }

    fn retire(&self, state: &mut PoolState) {
        state.workers = state.workers.saturating_sub(1);
        if state.workers == 0 && state.sender.is_none() {
            self.terminated.notify_all();
        }
    }

    fn run_task(&self, worker: &WorkerInfo, task: &TaskRef) {
        self.active.fetch_add(1, Ordering::SeqCst);
        defer! {
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        if panic::catch_unwind(AssertUnwindSafe(|| self.hooks.before_execute(worker, task)))
            .is_err()
        {
            log::error!("before-execute hook panicked for task '{}'.", task.name());
        }

        let error = match panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(Arc::new(e)),
            Err(payload) => Some(Arc::new(TaskError::Panicked {
                name: task.name().to_string(),
                message: panic_message(payload.as_ref()),
            })),
        };
        if let Some(e) = &error {
            log::warn!("Task '{}' ended with an error: {}", task.name(), e);
        }

        if panic::catch_unwind(AssertUnwindSafe(|| {
            self.hooks.after_execute(task, error.as_ref());
        }))
        .is_err()
        {
            log::error!("after-execute hook panicked for task '{}'.", task.name());
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
