// src/threshold.rs - Two-phase resource threshold and on-demand reclamation

use crate::event::HostEvent;
use crate::reclaim::Reclaimer;
use crate::scheduler::{IdleDelay, Scheduler, TriggerSpec};
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub const STEADY_ON_INIT_TASK: &str = "threshold-steady";
pub const STEADY_ON_IDLE_TASK: &str = "threshold-steady-idle";
pub const RECLAIM_ON_FOCUS_TASK: &str = "reclaim-focus-lost";
pub const RECLAIM_ON_IDLE_TASK: &str = "reclaim-idle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdPresets {
    /// Relaxed budget while the host initializes.
    pub startup: u64,
    /// Tightened budget once initialization finished.
    pub steady: u64,
}

impl Default for ThresholdPresets {
    fn default() -> Self {
        Self {
            startup: 64,
            steady: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdPhase {
    Relaxed,
    Steady,
}

/// Which lifecycle points drive the controller once installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimSchedule {
    /// Also tighten after this much idle time, for hosts that never send
    /// `post-init`.
    pub steady_after_idle: Option<IdleDelay>,
    pub reclaim_idle: Option<IdleDelay>,
    pub reclaim_on_focus_lost: bool,
}

impl Default for ReclaimSchedule {
    fn default() -> Self {
        Self {
            steady_after_idle: None,
            reclaim_idle: None,
            reclaim_on_focus_lost: true,
        }
    }
}

/// Read-only view of the shared threshold.
#[derive(Debug, Clone)]
pub struct ThresholdReader(Arc<AtomicU64>);

impl ThresholdReader {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sole owner of the resource threshold.
///
/// The threshold starts at the relaxed `startup` preset and drops to the
/// `steady` preset exactly once. Reclamation runs independently of that
/// transition and never changes the threshold.
pub struct ThresholdController {
    value: Arc<AtomicU64>,
    steady: AtomicBool,
    presets: ThresholdPresets,
    reclaimer: Arc<dyn Reclaimer>,
}

impl ThresholdController {
    /// Create a controller sitting at the startup preset
    ///
    /// # Arguments
    ///
    /// * `presets` - Startup and steady values; `steady` should not exceed `startup`
    /// * `reclaimer` - What `reclaim_now` asks to release memory
    pub fn new(presets: ThresholdPresets, reclaimer: Arc<dyn Reclaimer>) -> Self {
        info!("Resource threshold set to startup preset {}", presets.startup);
        Self {
            value: Arc::new(AtomicU64::new(presets.startup)),
            steady: AtomicBool::new(false),
            presets,
            reclaimer,
        }
    }

    pub fn threshold(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn reader(&self) -> ThresholdReader {
        ThresholdReader(self.value.clone())
    }

    pub fn presets(&self) -> ThresholdPresets {
        self.presets
    }

    pub fn phase(&self) -> ThresholdPhase {
        if self.steady.load(Ordering::SeqCst) {
            ThresholdPhase::Steady
        } else {
            ThresholdPhase::Relaxed
        }
    }

    /// Moves to the steady preset. Returns false if already steady.
    pub fn finish_init(&self) -> bool {
        if self
            .steady
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.value.store(self.presets.steady, Ordering::SeqCst);
        info!("Resource threshold tightened to steady preset {}", self.presets.steady);
        true
    }

    /// Reclaims down to the current threshold, synchronously.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Units the reclaimer released (zero when already under budget)
    /// * `Err(anyhow::Error)` - The reclaimer's failure; the threshold is untouched
    pub fn reclaim_now(&self) -> anyhow::Result<usize> {
        let budget = self.threshold();
        let released = self.reclaimer.reclaim(budget)?;
        debug!("Reclamation released {} units (budget {})", released, budget);
        Ok(released)
    }

    /// Registers the lifecycle and reclamation tasks on `scheduler`.
    ///
    /// # Arguments
    ///
    /// * `scheduler` - Receives `threshold-steady` on `post-init`, plus the
    ///   optional idle and focus-lost tasks
    /// * `schedule` - Which of the optional tasks to register
    pub fn install(self: &Arc<Self>, scheduler: &Scheduler, schedule: &ReclaimSchedule) {
        let controller = self.clone();
        scheduler.register(
            STEADY_ON_INIT_TASK,
            TriggerSpec::on_event(HostEvent::PostInit),
            move || {
                controller.finish_init();
                Ok(())
            },
        );

        if let Some(delay) = schedule.steady_after_idle {
            let controller = self.clone();
            scheduler.register(
                STEADY_ON_IDLE_TASK,
                TriggerSpec::IdleAfter {
                    delay,
                    repeating: false,
                },
                move || {
                    controller.finish_init();
                    Ok(())
                },
            );
        }

        if schedule.reclaim_on_focus_lost {
            let controller = self.clone();
            scheduler.register(
                RECLAIM_ON_FOCUS_TASK,
                TriggerSpec::on_event(HostEvent::FocusLost),
                move || controller.reclaim_now().map(|_| ()),
            );
        }

        if let Some(delay) = schedule.reclaim_idle {
            let controller = self.clone();
            scheduler.register(
                RECLAIM_ON_IDLE_TASK,
                TriggerSpec::IdleAfter {
                    delay,
                    repeating: true,
                },
                move || controller.reclaim_now().map(|_| ()),
            );
        }
    }
}
