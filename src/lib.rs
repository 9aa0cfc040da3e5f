// lib.rs - Library root for the housekeeper scheduler

pub mod cli;
pub mod config;
pub mod event;
pub mod host;
pub mod reclaim;
pub mod replay;
pub mod scheduler;
pub mod session;
pub mod threshold;
pub mod watch;
