use crate::event::HostEvent;
use crate::scheduler::{IdleDelay, SchedulerError, TriggerSpec};
use crate::threshold::{ReclaimSchedule, ThresholdPresets};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Invalid config format: {0}")]
    Parse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// A schedule file: threshold presets plus `[[task]]` entries
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HousekeeperConfig {
    #[serde(default)]
    pub threshold: ThresholdConfig,
    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdConfig {
    pub startup: u64,
    pub steady: u64,
    pub steady_after_idle_secs: Option<f64>,
    pub reclaim_idle_secs: Option<f64>,
    pub reclaim_on_focus_lost: bool,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let presets = ThresholdPresets::default();
        Self {
            startup: presets.startup,
            steady: presets.steady,
            steady_after_idle_secs: None,
            reclaim_idle_secs: None,
            reclaim_on_focus_lost: true,
        }
    }
}

/// What a configured task does when dispatched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskAction {
    #[default]
    Log,
    /// Rebuild a derived view into the host's view cache.
    Refresh,
    Reclaim,
    /// Always fails; used to rehearse failure handling in a schedule.
    Fail,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    pub name: String,
    pub idle_secs: Option<f64>,
    pub event: Option<HostEvent>,
    #[serde(default = "default_repeating")]
    pub repeating: bool,
    #[serde(default)]
    pub action: TaskAction,
}

fn default_repeating() -> bool {
    true
}

fn delay_from_secs(field: &str, secs: f64) -> Result<IdleDelay, ConfigError> {
    IdleDelay::from_secs_f64(secs).map_err(|e: SchedulerError| {
        ConfigError::Invalid(format!("{} = {}: {}", field, secs, e))
    })
}

impl TaskConfig {
    /// Exactly one of `idle_secs` and `event` must be set.
    pub fn trigger(&self) -> Result<TriggerSpec, ConfigError> {
        match (&self.idle_secs, &self.event) {
            (Some(secs), None) => Ok(TriggerSpec::IdleAfter {
                delay: delay_from_secs(&format!("task '{}' idle_secs", self.name), *secs)?,
                repeating: self.repeating,
            }),
            (None, Some(event)) if event.as_str().is_empty() => Err(ConfigError::Invalid(format!(
                "task '{}' has an empty event name",
                self.name
            ))),
            (None, Some(event)) => Ok(TriggerSpec::OnEvent(event.clone())),
            _ => Err(ConfigError::Invalid(format!(
                "task '{}' needs exactly one of idle_secs or event",
                self.name
            ))),
        }
    }
}

impl HousekeeperConfig {
    /// Load and validate a schedule file
    ///
    /// # Arguments
    ///
    /// * `path` - TOML file to read
    ///
    /// # Returns
    ///
    /// * `Ok(HousekeeperConfig)` - A schedule that passed [`HousekeeperConfig::validate`]
    /// * `Err(ConfigError::Read)` - If the file can't be read
    /// * `Err(ConfigError::Parse)` - If the TOML is malformed or has unknown keys
    /// * `Err(ConfigError::Invalid)` - If a value is out of range or inconsistent
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: HousekeeperConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks presets, delays, task names and triggers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold.steady > self.threshold.startup {
            return Err(ConfigError::Invalid(format!(
                "steady threshold {} exceeds startup threshold {}",
                self.threshold.steady, self.threshold.startup
            )));
        }
        self.schedule()?;

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.name.trim().is_empty() {
                return Err(ConfigError::Invalid("task name must not be empty".to_string()));
            }
            if !seen.insert(task.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate task '{}'", task.name)));
            }
            task.trigger()?;
        }
        Ok(())
    }

    pub fn presets(&self) -> ThresholdPresets {
        ThresholdPresets {
            startup: self.threshold.startup,
            steady: self.threshold.steady,
        }
    }

    pub fn schedule(&self) -> Result<ReclaimSchedule, ConfigError> {
        let steady_after_idle = self
            .threshold
            .steady_after_idle_secs
            .map(|secs| delay_from_secs("steady_after_idle_secs", secs))
            .transpose()?;
        let reclaim_idle = self
            .threshold
            .reclaim_idle_secs
            .map(|secs| delay_from_secs("reclaim_idle_secs", secs))
            .transpose()?;
        Ok(ReclaimSchedule {
            steady_after_idle,
            reclaim_idle,
            reclaim_on_focus_lost: self.threshold.reclaim_on_focus_lost,
        })
    }
}

/// Environment variable naming a schedule file. Checked before the user's
/// config directory.
pub const CONFIG_ENV: &str = "HOUSEKEEPER_CONFIG";

/// `<config dir>/housekeeper/schedule.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("housekeeper").join("schedule.toml"))
}

/// Picks the schedule to load when no `--config` flag was given.
///
/// # Arguments
///
/// * `from_env` - Value of [`CONFIG_ENV`], used as-is even if the file is
///   missing so the load reports the bad path
/// * `default_path` - The per-user schedule, used only if it exists
fn resolve_config(from_env: Option<PathBuf>, default_path: Option<PathBuf>) -> Option<PathBuf> {
    from_env
        .filter(|path| !path.as_os_str().is_empty())
        .or_else(|| default_path.filter(|path| path.is_file()))
}

pub fn find_config_file() -> Option<PathBuf> {
    resolve_config(
        std::env::var_os(CONFIG_ENV).map(PathBuf::from),
        default_config_path(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[threshold]
startup = 64
steady = 32
steady_after_idle_secs = 5
reclaim_idle_secs = 15

[[task]]
name = "autosave"
idle_secs = 5

[[task]]
name = "agenda-refresh"
event = "focus-lost"
action = "refresh"

[[task]]
name = "init-banner"
idle_secs = 0.5
repeating = false
"#;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = HousekeeperConfig::parse("").unwrap();
        assert!(config.tasks.is_empty());
        assert_eq!(config.presets(), ThresholdPresets::default());
        assert_eq!(config.schedule().unwrap(), ReclaimSchedule::default());
    }

    #[test]
    fn test_parse_sample() {
        let config = HousekeeperConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.tasks.len(), 3);

        let autosave = &config.tasks[0];
        assert_eq!(autosave.action, TaskAction::Log);
        assert_eq!(
            autosave.trigger().unwrap(),
            TriggerSpec::idle_after(Duration::from_secs(5), true).unwrap()
        );

        let agenda = &config.tasks[1];
        assert_eq!(agenda.action, TaskAction::Refresh);
        assert_eq!(agenda.trigger().unwrap(), TriggerSpec::OnEvent(HostEvent::FocusLost));

        let banner = &config.tasks[2];
        assert_eq!(
            banner.trigger().unwrap(),
            TriggerSpec::idle_after(Duration::from_millis(500), false).unwrap()
        );

        let schedule = config.schedule().unwrap();
        assert_eq!(schedule.reclaim_idle, Some(IdleDelay::from_secs(15).unwrap()));
        assert!(schedule.reclaim_on_focus_lost);
    }

    #[test]
    fn test_zero_idle_rejected() {
        let err = HousekeeperConfig::parse("[[task]]\nname = \"x\"\nidle_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_huge_idle_rejected() {
        let err = HousekeeperConfig::parse("[[task]]\nname = \"x\"\nidle_secs = 1e30\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = HousekeeperConfig::parse("[threshold]\nreclaim_idle_secs = 1e30\n").unwrap_err();
        assert!(err.to_string().contains("reclaim_idle_secs"));
    }

    #[test]
    fn test_empty_event_name_rejected() {
        for name in ["", "   "] {
            let content = format!("[[task]]\nname = \"x\"\nevent = \"{}\"\n", name);
            let err = HousekeeperConfig::parse(&content).unwrap_err();
            assert!(err.to_string().contains("empty event name"));
        }
    }

    #[test]
    fn test_task_needs_exactly_one_trigger() {
        let both = "[[task]]\nname = \"x\"\nidle_secs = 1\nevent = \"focus-lost\"\n";
        assert!(matches!(
            HousekeeperConfig::parse(both),
            Err(ConfigError::Invalid(_))
        ));
        let neither = "[[task]]\nname = \"x\"\n";
        assert!(matches!(
            HousekeeperConfig::parse(neither),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_duplicate_task_names_rejected() {
        let dup = "[[task]]\nname = \"x\"\nidle_secs = 1\n[[task]]\nname = \"x\"\nevent = \"post-init\"\n";
        let err = HousekeeperConfig::parse(dup).unwrap_err();
        assert!(err.to_string().contains("duplicate task 'x'"));
    }

    #[test]
    fn test_steady_above_startup_rejected() {
        let err = HousekeeperConfig::parse("[threshold]\nstartup = 16\nsteady = 32\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        let err = HousekeeperConfig::parse("[threshold]\nstartp = 16\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = HousekeeperConfig::from_file(&path).unwrap();
        assert_eq!(config.tasks.len(), 3);

        let missing = HousekeeperConfig::from_file(&temp_dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Read(_))));
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("housekeeper/schedule.toml"));
        }
    }

    #[test]
    fn test_resolve_config() {
        let temp_dir = TempDir::new().unwrap();
        let user = temp_dir.path().join("schedule.toml");
        let explicit = temp_dir.path().join("elsewhere.toml");

        // A missing per-user schedule means built-in defaults
        assert_eq!(resolve_config(None, Some(user.clone())), None);

        std::fs::write(&user, SAMPLE).unwrap();
        assert_eq!(resolve_config(None, Some(user.clone())), Some(user.clone()));

        // The environment wins, even before the file exists
        assert_eq!(
            resolve_config(Some(explicit.clone()), Some(user.clone())),
            Some(explicit)
        );
        assert_eq!(
            resolve_config(Some(PathBuf::new()), Some(user.clone())),
            Some(user)
        );
    }
}
