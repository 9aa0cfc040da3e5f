// src/event.rs - Named host events delivered to the scheduler

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HostEvent {
    FocusLost,
    FocusGained,
    PreCommand,
    PostCommand,
    PostInit,
    Custom(String),
}

impl HostEvent {
    pub fn as_str(&self) -> &str {
        match self {
            HostEvent::FocusLost => "focus-lost",
            HostEvent::FocusGained => "focus-gained",
            HostEvent::PreCommand => "pre-command",
            HostEvent::PostCommand => "post-command",
            HostEvent::PostInit => "post-init",
            HostEvent::Custom(name) => name,
        }
    }
}

impl From<&str> for HostEvent {
    fn from(name: &str) -> Self {
        match name.trim() {
            "focus-lost" => HostEvent::FocusLost,
            "focus-gained" => HostEvent::FocusGained,
            "pre-command" => HostEvent::PreCommand,
            "post-command" => HostEvent::PostCommand,
            "post-init" => HostEvent::PostInit,
            other => HostEvent::Custom(other.to_string()),
        }
    }
}

impl From<String> for HostEvent {
    fn from(name: String) -> Self {
        HostEvent::from(name.as_str())
    }
}

impl From<HostEvent> for String {
    fn from(event: HostEvent) -> Self {
        event.as_str().to_string()
    }
}

impl FromStr for HostEvent {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(HostEvent::from(s))
    }
}

impl fmt::Display for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
