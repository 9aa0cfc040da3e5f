// src/scheduler/task.rs - Task identifiers, trigger specifications and bodies

use crate::event::HostEvent;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("idle delay must be strictly positive")]
    ZeroDelay,
    #[error("idle delay is out of range: {0}")]
    DelayOutOfRange(String),
}

/// Unique name of a maintenance task within a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TaskId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Idle time a task waits for. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IdleDelay(Duration);

impl IdleDelay {
    pub fn new(duration: Duration) -> Result<Self, SchedulerError> {
        if duration.is_zero() {
            return Err(SchedulerError::ZeroDelay);
        }
        Ok(Self(duration))
    }

    pub fn from_secs(secs: u64) -> Result<Self, SchedulerError> {
        Self::new(Duration::from_secs(secs))
    }

    pub fn from_secs_f64(secs: f64) -> Result<Self, SchedulerError> {
        if secs.is_nan() || secs <= 0.0 {
            return Err(SchedulerError::ZeroDelay);
        }
        let duration = Duration::try_from_secs_f64(secs)
            .map_err(|e| SchedulerError::DelayOutOfRange(e.to_string()))?;
        Self::new(duration)
    }

    pub fn duration(self) -> Duration {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSpec {
    /// Due once the host has been idle for `delay`.
    IdleAfter { delay: IdleDelay, repeating: bool },
    /// Due when the named host event fires.
    OnEvent(HostEvent),
}

impl TriggerSpec {
    pub fn idle_after(duration: Duration, repeating: bool) -> Result<Self, SchedulerError> {
        Ok(TriggerSpec::IdleAfter {
            delay: IdleDelay::new(duration)?,
            repeating,
        })
    }

    pub fn on_event(event: impl Into<HostEvent>) -> Self {
        TriggerSpec::OnEvent(event.into())
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TriggerSpec::IdleAfter { .. })
    }
}

impl fmt::Display for TriggerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSpec::IdleAfter { delay, repeating } => write!(
                f,
                "idle {:?}{}",
                delay.duration(),
                if *repeating { " (repeating)" } else { " (once)" }
            ),
            TriggerSpec::OnEvent(event) => write!(f, "on {}", event),
        }
    }
}

/// Body of a housekeeping task. Failures are reported, never propagated.
pub type TaskBody = Box<dyn FnMut() -> anyhow::Result<()> + Send>;

/// A body shared between the registry and an in-flight dispatch.
pub type SharedTaskBody = Arc<Mutex<TaskBody>>;

pub fn share_body<F>(body: F) -> SharedTaskBody
where
    F: FnMut() -> anyhow::Result<()> + Send + 'static,
{
    Arc::new(Mutex::new(Box::new(body)))
}
