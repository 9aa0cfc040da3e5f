// src/scheduler/registry.rs - Registered maintenance tasks in registration order

use super::task::{SharedTaskBody, TaskId, TriggerSpec};
use crate::event::HostEvent;
use log::debug;
use std::time::Duration;

pub struct Task {
    pub id: TaskId,
    pub trigger: TriggerSpec,
    pub enabled: bool,
    /// Registration sequence number, unique within one registry.
    generation: u64,
    /// Idle sample the task was armed at. `None` arms on the next tick.
    baseline: Option<Duration>,
    body: SharedTaskBody,
}

impl Task {
    fn is_due(&self, idle: Duration, last_event: Option<&HostEvent>) -> bool {
        if !self.enabled {
            return false;
        }
        match &self.trigger {
            TriggerSpec::IdleAfter { delay, .. } => match self.baseline {
                Some(baseline) => idle.saturating_sub(baseline) >= delay.duration(),
                None => false,
            },
            TriggerSpec::OnEvent(event) => last_event == Some(event),
        }
    }
}

/// Maintenance tasks keyed by id, kept in registration order.
///
/// Every registration (including a replacement) takes the next generation
/// number. A dispatch pass records [`TaskRegistry::generation`] before it
/// runs anything, so tasks registered by a body during that pass wait for
/// the next one.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    next_generation: u64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_generation: 0,
        }
    }

    /// Stores `body` under `id`, replacing any previous task with that id.
    ///
    /// # Arguments
    ///
    /// * `id` - Unique task name; an existing task with this name is dropped
    /// * `trigger` - When the task becomes due
    /// * `body` - Work to run on dispatch
    ///
    /// A replacement counts as a fresh registration: it moves to the end of
    /// the dispatch order and is re-armed on the next tick.
    pub fn register(&mut self, id: TaskId, trigger: TriggerSpec, body: SharedTaskBody) {
        if self.unregister(&id) {
            debug!("Replacing task {}", id);
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        self.tasks.push(Task {
            id,
            trigger,
            enabled: true,
            generation,
            baseline: None,
            body,
        });
    }

    pub fn unregister(&mut self, id: &TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| &task.id != id);
        self.tasks.len() != before
    }

    /// Ids whose trigger is satisfied, in registration order. Pure.
    ///
    /// # Arguments
    ///
    /// * `idle` - Time since the last user input, as sampled by the host
    /// * `last_event` - The event being delivered, if any
    ///
    /// # Returns
    ///
    /// Enabled tasks that are armed and `idle` past their baseline, plus
    /// tasks waiting on `last_event`. Disabled one-shots never appear.
    pub fn list_due(&self, idle: Duration, last_event: Option<&HostEvent>) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|task| task.is_due(idle, last_event))
            .map(|task| task.id.clone())
            .collect()
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|task| task.id.clone()).collect()
    }

    pub fn trigger(&self, id: &TaskId) -> Option<&TriggerSpec> {
        self.get(id).map(|task| &task.trigger)
    }

    pub fn is_enabled(&self, id: &TaskId) -> bool {
        self.get(id).is_some_and(|task| task.enabled)
    }

    pub fn body(&self, id: &TaskId) -> Option<SharedTaskBody> {
        self.get(id).map(|task| task.body.clone())
    }

    /// Generation the next registration will take.
    pub fn generation(&self) -> u64 {
        self.next_generation
    }

    /// Body of `id` if it was registered before `cutoff`.
    pub fn body_before(&self, id: &TaskId, cutoff: u64) -> Option<SharedTaskBody> {
        self.get(id)
            .filter(|task| task.generation < cutoff)
            .map(|task| task.body.clone())
    }

    pub(crate) fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| &task.id == id)
    }

    /// Arms every idle task still waiting for a baseline at `idle`.
    pub(crate) fn arm_pending(&mut self, idle: Duration) {
        for task in self.tasks.iter_mut().filter(|t| t.trigger.is_idle()) {
            if task.baseline.is_none() {
                task.baseline = Some(idle);
            }
        }
    }

    /// User input started a new idle period.
    pub(crate) fn restart_idle_baselines(&mut self) {
        for task in self.tasks.iter_mut().filter(|t| t.trigger.is_idle()) {
            task.baseline = Some(Duration::ZERO);
        }
    }

    /// Re-arms a repeating task on the next tick, or disables a one-shot.
    pub(crate) fn mark_fired(&mut self, id: &TaskId) {
        if let Some(task) = self.get_mut(id)
            && let TriggerSpec::IdleAfter { repeating, .. } = task.trigger
        {
            if repeating {
                task.baseline = None;
            } else {
                task.enabled = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::task::share_body;

    fn noop() -> SharedTaskBody {
        share_body(|| Ok(()))
    }

    fn idle(secs: u64) -> Duration {
        Duration::from_secs(secs)
    }

    #[test]
    fn test_register_replaces_same_id() {
        let mut registry = TaskRegistry::new();
        registry.register("a".into(), TriggerSpec::on_event("focus-lost"), noop());
        registry.register("b".into(), TriggerSpec::on_event("focus-lost"), noop());
        registry.register("a".into(), TriggerSpec::on_event("post-init"), noop());

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec![TaskId::from("b"), TaskId::from("a")]);
        assert_eq!(
            registry.trigger(&"a".into()),
            Some(&TriggerSpec::on_event("post-init"))
        );
    }

    #[test]
    fn test_unregister() {
        let mut registry = TaskRegistry::new();
        registry.register("a".into(), TriggerSpec::on_event("focus-lost"), noop());
        assert!(registry.unregister(&"a".into()));
        assert!(!registry.unregister(&"a".into()));
        assert!(registry.is_empty());

        let due = registry.list_due(idle(0), Some(&HostEvent::FocusLost));
        assert!(due.is_empty());
    }

    #[test]
    fn test_list_due_events_in_registration_order() {
        let mut registry = TaskRegistry::new();
        registry.register("second".into(), TriggerSpec::on_event("focus-lost"), noop());
        registry.register("other".into(), TriggerSpec::on_event("post-init"), noop());
        registry.register("first".into(), TriggerSpec::on_event("focus-lost"), noop());

        let due = registry.list_due(idle(0), Some(&HostEvent::FocusLost));
        assert_eq!(due, vec![TaskId::from("second"), TaskId::from("first")]);
        assert!(registry.list_due(idle(0), None).is_empty());
    }

    #[test]
    fn test_idle_task_not_due_until_armed() {
        let mut registry = TaskRegistry::new();
        let spec = TriggerSpec::idle_after(idle(10), true).unwrap();
        registry.register("gc".into(), spec, noop());

        assert!(registry.list_due(idle(100), None).is_empty());

        registry.arm_pending(idle(5));
        assert!(registry.list_due(idle(14), None).is_empty());
        assert_eq!(
            registry.list_due(idle(15), None),
            vec![TaskId::from("gc")]
        );
    }

    #[test]
    fn test_list_due_is_pure() {
        let mut registry = TaskRegistry::new();
        let spec = TriggerSpec::idle_after(idle(1), false).unwrap();
        registry.register("once".into(), spec, noop());
        registry.arm_pending(idle(0));

        assert_eq!(registry.list_due(idle(2), None).len(), 1);
        assert_eq!(registry.list_due(idle(2), None).len(), 1);
        assert!(registry.is_enabled(&"once".into()));
    }

    #[test]
    fn test_registration_after_cutoff_is_withheld() {
        let mut registry = TaskRegistry::new();
        registry.register("early".into(), TriggerSpec::on_event("focus-lost"), noop());
        let cutoff = registry.generation();
        registry.register("late".into(), TriggerSpec::on_event("focus-lost"), noop());

        assert!(registry.body_before(&"early".into(), cutoff).is_some());
        assert!(registry.body_before(&"late".into(), cutoff).is_none());
        assert!(registry.body_before(&"late".into(), registry.generation()).is_some());

        // Replacing a task gives it a fresh generation
        registry.register("early".into(), TriggerSpec::on_event("post-init"), noop());
        assert!(registry.body_before(&"early".into(), cutoff).is_none());
    }

    #[test]
    fn test_due_regardless_of_registration_time() {
        let mut registry = TaskRegistry::new();
        registry.register("save".into(), TriggerSpec::on_event("focus-lost"), noop());
        assert_eq!(
            registry.list_due(idle(0), Some(&HostEvent::FocusLost)),
            vec![TaskId::from("save")]
        );
    }

    #[test]
    fn test_mark_fired_one_shot_disables() {
        let mut registry = TaskRegistry::new();
        let spec = TriggerSpec::idle_after(idle(1), false).unwrap();
        registry.register("once".into(), spec, noop());
        registry.arm_pending(idle(0));
        registry.mark_fired(&"once".into());

        assert!(!registry.is_enabled(&"once".into()));
        assert!(registry.list_due(idle(1000), None).is_empty());
    }

    #[test]
    fn test_mark_fired_repeating_rearms_next_tick() {
        let mut registry = TaskRegistry::new();
        let spec = TriggerSpec::idle_after(idle(10), true).unwrap();
        registry.register("gc".into(), spec, noop());
        registry.arm_pending(idle(0));
        registry.mark_fired(&"gc".into());

        assert!(registry.list_due(idle(50), None).is_empty());
        registry.arm_pending(idle(50));
        assert_eq!(registry.list_due(idle(60), None).len(), 1);
    }

    #[test]
    fn test_restart_idle_baselines() {
        let mut registry = TaskRegistry::new();
        let spec = TriggerSpec::idle_after(idle(10), true).unwrap();
        registry.register("gc".into(), spec, noop());
        registry.arm_pending(idle(40));
        registry.restart_idle_baselines();

        assert_eq!(registry.list_due(idle(10), None).len(), 1);
    }
}
