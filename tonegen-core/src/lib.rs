#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # Tonegen Core
//!
//! Interrupt-driven square-wave synthesis for small microcontrollers.
//! A timer interrupt advances shared state and toggles an output; a
//! foreground loop reads switches, re-parameterises the interrupt side and
//! drives slower LED effects.

// Logging compiles away unless the `defmt` feature is enabled
#[cfg(feature = "defmt")]
macro_rules! debug {
    ($($arg:tt)*) => { defmt::debug!($($arg)*) };
}

#[cfg(feature = "defmt")]
macro_rules! trace {
    ($($arg:tt)*) => { defmt::trace!($($arg)*) };
}

#[cfg(not(feature = "defmt"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "defmt"))]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

pub mod types;
pub mod shared;
pub mod engine;
pub mod controller;
pub mod hal;

#[cfg(feature = "test-utils")]
pub mod test_utils;


pub use types::*;
pub use shared::*;
pub use engine::*;
pub use controller::*;
pub use hal::{CoarseDelay, DigitalIo, HalError, InterruptAck, InterruptHandler, IsrFn, TimerMode, TimerPeripheral};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reference fixed-count deployment (event roughly every 0.25 s)
pub fn default_event_config() -> EventConfig {
    EventConfig::default()
}

/// Reference phase-accumulator deployment (200 Hz steps up to 3200 Hz)
pub fn default_phase_config() -> PhaseConfig {
    PhaseConfig::default()
}

/// Reference lookup-table deployment (200 Hz to 3600 Hz)
pub fn default_reload_config() -> ReloadConfig {
    ReloadConfig::default()
}
