// Common test utilities for scheduler scenarios

use housekeeper::scheduler::{FailureSink, TaskFailure, TaskId};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[allow(dead_code)]
pub fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

/// Shared, ordered log of what task bodies did
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| e.as_str() == entry).count()
    }

    /// Body that appends `entry` each time it runs
    pub fn recorder(&self, entry: &str) -> impl FnMut() -> anyhow::Result<()> + Send + 'static {
        let journal = self.clone();
        let entry = entry.to_string();
        move || {
            journal.push(entry.clone());
            Ok(())
        }
    }
}

/// Failure sink that keeps every report
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(TaskId, String)>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<(TaskId, String)> {
        self.reports.lock().unwrap().clone()
    }
}

impl FailureSink for RecordingSink {
    fn report(&self, id: &TaskId, failure: &TaskFailure) {
        self.reports
            .lock()
            .unwrap()
            .push((id.clone(), failure.to_string()));
    }
}
