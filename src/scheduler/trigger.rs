// src/scheduler/trigger.rs - Turns host ticks and events into due tasks

use super::registry::TaskRegistry;
use super::task::TaskId;
use crate::event::HostEvent;
use log::trace;
use std::time::Duration;

/// Tracks the host's idle samples between ticks. Never blocks; each check
/// walks the registry once.
#[derive(Debug, Default)]
pub struct TriggerEngine {
    last_idle: Option<Duration>,
}

impl TriggerEngine {
    pub fn new() -> Self {
        Self { last_idle: None }
    }

    pub fn last_idle(&self) -> Option<Duration> {
        self.last_idle
    }

    /// Evaluates idle triggers for one host tick and returns the due ids in
    /// registration order. Repeating tasks are re-armed on the following
    /// tick; one-shot tasks are disabled.
    ///
    /// An `idle` sample lower than the previous one means user input
    /// happened in between, so every idle baseline restarts at zero.
    pub fn tick(&mut self, registry: &mut TaskRegistry, idle: Duration) -> Vec<TaskId> {
        if self.last_idle.is_some_and(|last| idle < last) {
            trace!("Idle period restarted at {:?}", idle);
            registry.restart_idle_baselines();
        }
        registry.arm_pending(idle);
        self.last_idle = Some(idle);

        let due = registry.list_due(idle, None);
        for id in &due {
            registry.mark_fired(id);
        }
        due
    }

    /// Returns the tasks waiting on `event`. Idle triggers are only
    /// evaluated on ticks.
    pub fn event(&self, registry: &TaskRegistry, event: &HostEvent) -> Vec<TaskId> {
        registry.list_due(Duration::ZERO, Some(event))
    }
}
