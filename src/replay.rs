// src/replay.rs - Deterministic replay of host traces against a session

use crate::event::HostEvent;
use crate::scheduler::{Dispatch, DispatchOutcome, TaskId};
use crate::session::Session;
use log::debug;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(thiserror::Error, Debug)]
pub enum TraceError {
    #[error("Failed to read trace: {0}")]
    Read(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// One host loop iteration: an idle sample or a named event.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceStep {
    Tick(Duration),
    Event(HostEvent),
}

impl fmt::Display for TraceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceStep::Tick(idle) => write!(f, "tick {}", idle.as_secs_f64()),
            TraceStep::Event(event) => write!(f, "event {}", event),
        }
    }
}

/// Parses `tick <secs>` / `event <name>` lines. Blank lines and `#`
/// comments are skipped.
pub fn parse_trace(content: &str) -> Result<Vec<TraceStep>, TraceError> {
    let mut steps = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let syntax = |message: String| TraceError::Syntax {
            line: index + 1,
            message,
        };

        let (directive, arg) = line
            .split_once(char::is_whitespace)
            .map(|(d, a)| (d, a.trim()))
            .unwrap_or((line, ""));
        match directive {
            "tick" => {
                let secs: f64 = arg
                    .parse()
                    .map_err(|_| syntax(format!("invalid idle seconds '{}'", arg)))?;
                if secs.is_nan() || secs < 0.0 {
                    return Err(syntax(format!("idle seconds must be >= 0, got {}", arg)));
                }
                let idle = Duration::try_from_secs_f64(secs)
                    .map_err(|e| syntax(format!("idle seconds {}: {}", arg, e)))?;
                steps.push(TraceStep::Tick(idle));
            }
            "event" => {
                if arg.is_empty() {
                    return Err(syntax("event needs a name".to_string()));
                }
                steps.push(TraceStep::Event(HostEvent::from(arg)));
            }
            other => return Err(syntax(format!("unknown directive '{}'", other))),
        }
    }
    Ok(steps)
}

pub fn load_trace(path: &Path) -> Result<Vec<TraceStep>, TraceError> {
    let content = std::fs::read_to_string(path)?;
    parse_trace(&content)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchRecord {
    pub task: TaskId,
    pub outcome: OutcomeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Dispatch> for DispatchRecord {
    fn from(dispatch: Dispatch) -> Self {
        let (outcome, error) = match dispatch.outcome {
            DispatchOutcome::Completed => (OutcomeKind::Completed, None),
            DispatchOutcome::Failed(failure) => (OutcomeKind::Failed, Some(failure.to_string())),
            DispatchOutcome::Skipped => (OutcomeKind::Skipped, None),
        };
        Self {
            task: dispatch.id,
            outcome,
            error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub directive: String,
    pub dispatched: Vec<DispatchRecord>,
    pub threshold: u64,
    pub cached_views: usize,
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>3}] {:<20} threshold={} views={}",
            self.step, self.directive, self.threshold, self.cached_views
        )?;
        for record in &self.dispatched {
            write!(f, "\n      -> {} ", record.task)?;
            match (&record.outcome, &record.error) {
                (OutcomeKind::Failed, Some(error)) => write!(f, "failed: {}", error)?,
                (OutcomeKind::Failed, None) => write!(f, "failed")?,
                (OutcomeKind::Completed, _) => write!(f, "ok")?,
                (OutcomeKind::Skipped, _) => write!(f, "skipped")?,
            }
        }
        Ok(())
    }
}

/// Feeds every step into the session's scheduler, in order.
///
/// # Arguments
///
/// * `session` - Configured scheduler, controller and view cache
/// * `steps` - Parsed trace
///
/// # Returns
///
/// One report per step with what was dispatched and the threshold and
/// cache size right after it.
pub fn replay(session: &Session, steps: &[TraceStep]) -> Vec<StepReport> {
    steps
        .iter()
        .enumerate()
        .map(|(step, directive)| {
            let now = Instant::now();
            let dispatched = match directive {
                TraceStep::Tick(idle) => session.scheduler.tick(now, *idle),
                TraceStep::Event(event) => session.scheduler.emit(now, event),
            };
            debug!("Step {} ({}) dispatched {} task(s)", step, directive, dispatched.len());
            StepReport {
                step,
                directive: directive.to_string(),
                dispatched: dispatched.into_iter().map(DispatchRecord::from).collect(),
                threshold: session.controller.threshold(),
                cached_views: session.views.len(),
            }
        })
        .collect()
}
