// src/scheduler/guard.rs - At-most-one execution per task, failure isolation

use super::task::{SharedTaskBody, TaskId};
use log::{debug, warn};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    Running,
}

#[derive(thiserror::Error, Debug)]
pub enum TaskFailure {
    #[error("{0:#}")]
    Error(anyhow::Error),
    #[error("panicked: {0}")]
    Panicked(String),
}

impl TaskFailure {
    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        TaskFailure::Panicked(message)
    }
}

#[derive(Debug)]
pub enum DispatchOutcome {
    Completed,
    Failed(TaskFailure),
    /// The task was already running; the due signal was dropped.
    Skipped,
}

impl DispatchOutcome {
    pub fn ran(&self) -> bool {
        !matches!(self, DispatchOutcome::Skipped)
    }
}

/// Receives failures caught at the guard boundary.
pub trait FailureSink: Send + Sync {
    fn report(&self, id: &TaskId, failure: &TaskFailure);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl FailureSink for LogSink {
    fn report(&self, id: &TaskId, failure: &TaskFailure) {
        warn!("Housekeeping task {} failed: {}", id, failure);
    }
}

pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ExecutionGuard {
    states: Mutex<HashMap<TaskId, ExecutionState>>,
    sink: Arc<dyn FailureSink>,
}

/// Marks a task `Running` for as long as it lives.
struct RunningSlot<'a> {
    guard: &'a ExecutionGuard,
    id: &'a TaskId,
}

impl Drop for RunningSlot<'_> {
    fn drop(&mut self) {
        lock(&self.guard.states).remove(self.id);
    }
}

impl Default for ExecutionGuard {
    fn default() -> Self {
        Self::new(Arc::new(LogSink))
    }
}

impl ExecutionGuard {
    pub fn new(sink: Arc<dyn FailureSink>) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            sink,
        }
    }

    pub fn state(&self, id: &TaskId) -> ExecutionState {
        lock(&self.states)
            .get(id)
            .copied()
            .unwrap_or(ExecutionState::Idle)
    }

    fn acquire<'a>(&'a self, id: &'a TaskId) -> Option<RunningSlot<'a>> {
        let mut states = lock(&self.states);
        if states.get(id) == Some(&ExecutionState::Running) {
            return None;
        }
        states.insert(id.clone(), ExecutionState::Running);
        Some(RunningSlot { guard: self, id })
    }

    /// Runs `body` unless `id` is already running. The state lock is never
    /// held while the body runs, so bodies may call back into the scheduler.
    ///
    /// # Returns
    ///
    /// * `Completed` - The body returned `Ok`
    /// * `Failed` - The body returned `Err` or panicked; already reported
    /// * `Skipped` - `id` was running, or the same body is running under
    ///   another id
    pub fn dispatch(&self, id: &TaskId, body: &SharedTaskBody) -> DispatchOutcome {
        let Some(_slot) = self.acquire(id) else {
            debug!("Task {} already running, dropping due signal", id);
            return DispatchOutcome::Skipped;
        };

        let result = {
            let mut running = match body.try_lock() {
                Ok(running) => running,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    debug!("Body of task {} is busy under another id, skipping", id);
                    return DispatchOutcome::Skipped;
                }
            };
            debug!("Running task {}", id);
            catch_unwind(AssertUnwindSafe(|| (*running)()))
        };

        let failure = match result {
            Ok(Ok(())) => return DispatchOutcome::Completed,
            Ok(Err(e)) => TaskFailure::Error(e),
            Err(payload) => TaskFailure::from_panic(payload),
        };
        self.sink.report(id, &failure);
        DispatchOutcome::Failed(failure)
    }
}
