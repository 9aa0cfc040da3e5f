// src/session.rs - A configured scheduler, controller and view cache

use crate::config::{ConfigError, HousekeeperConfig, TaskAction};
use crate::reclaim::ViewCache;
use crate::scheduler::{FailureSink, LogSink, Scheduler, TriggerSpec};
use crate::threshold::ThresholdController;
use log::info;
use std::sync::Arc;

/// Everything a host needs from one schedule file
///
/// The scheduler already carries the threshold controller's lifecycle and
/// reclamation tasks plus one task per `[[task]]` entry. The host only has
/// to feed it ticks and events.
pub struct Session {
    /// Handle to give the host loop (and to clone into task bodies)
    pub scheduler: Scheduler,
    /// Owner of the resource threshold
    pub controller: Arc<ThresholdController>,
    /// Derived views rebuilt by `refresh` tasks and trimmed on reclamation
    pub views: Arc<ViewCache>,
}

impl Session {
    /// Build a session whose task failures go to the log
    ///
    /// # Arguments
    ///
    /// * `config` - A parsed schedule; validated again here
    ///
    /// # Returns
    ///
    /// * `Ok(Session)` - Scheduler with every configured task registered
    /// * `Err(ConfigError::Invalid)` - If the schedule fails validation
    pub fn from_config(config: &HousekeeperConfig) -> Result<Self, ConfigError> {
        Self::with_sink(config, Arc::new(LogSink))
    }

    /// Same as [`Session::from_config`], reporting task failures to `sink`
    pub fn with_sink(config: &HousekeeperConfig, sink: Arc<dyn FailureSink>) -> Result<Self, ConfigError> {
        config.validate()?;

        let scheduler = Scheduler::with_sink(sink);
        let views = Arc::new(ViewCache::new());
        let controller = Arc::new(ThresholdController::new(config.presets(), views.clone()));
        controller.install(&scheduler, &config.schedule()?);

        let session = Self {
            scheduler,
            controller,
            views,
        };
        for task in &config.tasks {
            session.register_action(&task.name, task.trigger()?, task.action);
        }
        Ok(session)
    }

    fn register_action(&self, name: &str, trigger: TriggerSpec, action: TaskAction) {
        let name = name.to_string();
        match action {
            TaskAction::Log => {
                let label = name.clone();
                self.scheduler.register(name, trigger, move || {
                    info!("Housekeeping task {} ran", label);
                    Ok(())
                });
            }
            TaskAction::Refresh => {
                let views = self.views.clone();
                let label = name.clone();
                let mut generation: u64 = 0;
                self.scheduler.register(name, trigger, move || {
                    let n = generation;
                    generation += 1;
                    let key = format!("{}#{}", label, n);
                    views.get_or_load(&key, || Ok(format!("{} view, generation {}", label, n)))?;
                    Ok(())
                });
            }
            TaskAction::Reclaim => {
                let controller = self.controller.clone();
                self.scheduler
                    .register(name, trigger, move || controller.reclaim_now().map(|_| ()));
            }
            TaskAction::Fail => {
                let label = name.clone();
                self.scheduler.register(name, trigger, move || {
                    anyhow::bail!("task {} is configured to fail", label)
                });
            }
        }
    }
}
