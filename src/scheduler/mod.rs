// src/scheduler/mod.rs - Idle and event triggered housekeeping scheduler

pub mod guard;
pub mod registry;
pub mod task;
pub mod trigger;

pub use guard::{DispatchOutcome, ExecutionGuard, ExecutionState, FailureSink, LogSink, TaskFailure};
pub use registry::TaskRegistry;
pub use task::{IdleDelay, SchedulerError, SharedTaskBody, TaskBody, TaskId, TriggerSpec, share_body};
pub use trigger::TriggerEngine;

use crate::event::HostEvent;
use crate::host::HostListener;
use guard::lock;
use log::trace;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One dispatch attempt made for a due task.
#[derive(Debug)]
pub struct Dispatch {
    pub id: TaskId,
    pub outcome: DispatchOutcome,
}

/// Cheaply cloneable handle over a registry, trigger engine and execution
/// guard. Clones share state, so task bodies may hold a handle and call
/// back in; no internal lock is held while a body runs.
#[derive(Clone)]
pub struct Scheduler {
    registry: Arc<Mutex<TaskRegistry>>,
    engine: Arc<Mutex<TriggerEngine>>,
    guard: Arc<ExecutionGuard>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates an empty scheduler that logs task failures.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(LogSink))
    }

    /// Creates an empty scheduler reporting task failures to `sink`.
    pub fn with_sink(sink: Arc<dyn FailureSink>) -> Self {
        Self {
            registry: Arc::new(Mutex::new(TaskRegistry::new())),
            engine: Arc::new(Mutex::new(TriggerEngine::new())),
            guard: Arc::new(ExecutionGuard::new(sink)),
        }
    }

    /// Registers a maintenance task, silently replacing any task with the
    /// same id.
    ///
    /// # Arguments
    ///
    /// * `id` - Unique task name
    /// * `trigger` - Idle delay or host event the task waits for
    /// * `body` - Work to run; an `Err` or panic is reported to the failure
    ///   sink and never reaches the host
    ///
    /// Safe to call from inside a running body. A task registered that way
    /// is first considered on the next tick or event.
    pub fn register<F>(&self, id: impl Into<TaskId>, trigger: TriggerSpec, body: F)
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        self.register_shared(id, trigger, share_body(body));
    }

    /// Registers an already shared body.
    ///
    /// The same body may sit under several ids, but it runs under one at a
    /// time: dispatching another of its ids while it runs is `Skipped`.
    pub fn register_shared(&self, id: impl Into<TaskId>, trigger: TriggerSpec, body: SharedTaskBody) {
        let id = id.into();
        trace!("Registering task {} ({})", id, trigger);
        lock(&self.registry).register(id, trigger, body);
    }

    /// Cancels future triggers for `id`. An in-flight run is not interrupted.
    ///
    /// # Returns
    ///
    /// `true` if a task was registered under `id`.
    pub fn unregister(&self, id: &TaskId) -> bool {
        lock(&self.registry).unregister(id)
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        lock(&self.registry).contains(id)
    }

    pub fn len(&self) -> usize {
        lock(&self.registry).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.registry).is_empty()
    }

    pub fn ids(&self) -> Vec<TaskId> {
        lock(&self.registry).ids()
    }

    pub fn is_enabled(&self, id: &TaskId) -> bool {
        lock(&self.registry).is_enabled(id)
    }

    /// Tasks that would run for this sample and event, without running
    /// them or changing any state.
    ///
    /// # Arguments
    ///
    /// * `now` - Host timestamp of the query; only logged, since due-ness
    ///   depends on `idle` and `last_event` alone
    /// * `idle` - Time since the last user input
    /// * `last_event` - The event being delivered, if any
    pub fn list_due(&self, now: Instant, idle: Duration, last_event: Option<&HostEvent>) -> Vec<TaskId> {
        trace!("Listing due tasks at {:?} (idle {:?})", now, idle);
        lock(&self.registry).list_due(idle, last_event)
    }

    pub fn state(&self, id: &TaskId) -> ExecutionState {
        self.guard.state(id)
    }

    /// Feeds one idle sample and runs whatever became due.
    ///
    /// # Arguments
    ///
    /// * `now` - Host timestamp of the tick, from any clock the host likes
    /// * `idle` - Time since the last user input
    ///
    /// # Returns
    ///
    /// One [`Dispatch`] per task run (or skipped), in registration order.
    pub fn tick(&self, now: Instant, idle: Duration) -> Vec<Dispatch> {
        trace!("Tick at {:?} (idle {:?})", now, idle);
        let (due, cutoff) = {
            let mut engine = lock(&self.engine);
            let mut registry = lock(&self.registry);
            (engine.tick(&mut registry, idle), registry.generation())
        };
        self.run(due, cutoff)
    }

    /// Runs the tasks waiting on `event`, synchronously.
    ///
    /// # Returns
    ///
    /// One [`Dispatch`] per task run (or skipped), in registration order.
    pub fn emit(&self, now: Instant, event: &HostEvent) -> Vec<Dispatch> {
        trace!("Event {} at {:?}", event, now);
        let (due, cutoff) = {
            let engine = lock(&self.engine);
            let registry = lock(&self.registry);
            (engine.event(&registry, event), registry.generation())
        };
        self.run(due, cutoff)
    }

    fn run(&self, due: Vec<TaskId>, cutoff: u64) -> Vec<Dispatch> {
        let mut dispatched = Vec::with_capacity(due.len());
        for id in due {
            // An earlier body in this pass may have unregistered or replaced it
            let Some(body) = lock(&self.registry).body_before(&id, cutoff) else {
                continue;
            };
            let outcome = self.guard.dispatch(&id, &body);
            dispatched.push(Dispatch { id, outcome });
        }
        dispatched
    }
}

impl HostListener for Scheduler {
    fn on_tick(&self, now: Instant, idle: Duration) {
        self.tick(now, idle);
    }

    fn on_event(&self, now: Instant, event: &HostEvent) {
        self.emit(now, event);
    }
}
