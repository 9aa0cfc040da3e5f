// src/watch.rs - Live host loop: timer ticks plus stdin as user input

use crate::event::HostEvent;
use crate::host::{HostListener, IdleClock};
use log::{debug, info};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, PartialEq)]
pub enum InputLine {
    /// Anything typed counts as user input and restarts the idle period.
    Input,
    Event(HostEvent),
    Quit,
}

pub fn parse_input(line: &str) -> InputLine {
    let line = line.trim();
    if line == "!quit" {
        return InputLine::Quit;
    }
    match line.strip_prefix("!event") {
        Some(name) if !name.trim().is_empty() => InputLine::Event(HostEvent::from(name)),
        _ => InputLine::Input,
    }
}

/// Drives `listener` until stdin closes or `!quit` is read. Sends
/// `post-init` once the loop is set up.
pub async fn watch<L: HostListener>(listener: &L, period: Duration) -> anyhow::Result<()> {
    let mut clock = IdleClock::new(Instant::now());
    let mut interval = tokio::time::interval(period);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    listener.on_event(Instant::now(), &HostEvent::PostInit);
    info!("Watching host input (tick every {:?})", period);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                listener.on_tick(now, clock.idle(now));
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                let now = Instant::now();
                match parse_input(&line) {
                    InputLine::Quit => break,
                    InputLine::Event(event) => listener.on_event(now, &event),
                    InputLine::Input => {
                        clock.record_input(now);
                        listener.on_event(now, &HostEvent::PreCommand);
                    }
                }
            }
        }
    }
    Ok(())
}
