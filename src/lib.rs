//! liftlog: offline-first workout tracking core
//!
//! Session logging with an offline mutation queue, the in-progress workout
//! store and rest timer, and calendar/streak statistics.

pub mod cli;
pub mod config;
pub mod services;
pub mod types;
