//! State shared between the timer interrupt and the foreground loop
//!
//! Every variable has exactly one writer context. [`SharedState::split`]
//! hands out one [`InterruptSide`] and one [`ForegroundSide`]; a variable can
//! only be written through the side that owns it. All fields are at most one
//! 16-bit word and are accessed with plain atomic loads and stores, never a
//! read-modify-write, so a reader can observe an old value but never a torn
//! one.

use portable_atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

/// Cross-context variables of all three engines
pub struct SharedState {
    /// Writer: interrupt. Reader: interrupt only.
    tick_counter: AtomicU16,
    /// Set by interrupt, cleared by foreground.
    event_flag: AtomicBool,
    /// Writer: interrupt. Reader: interrupt, foreground snapshots.
    accumulator: AtomicU16,
    /// Writer: foreground. Reader: interrupt.
    increment: AtomicU8,
}

impl SharedState {
    pub const fn new() -> Self {
        Self {
            tick_counter: AtomicU16::new(0),
            event_flag: AtomicBool::new(false),
            accumulator: AtomicU16::new(0),
            increment: AtomicU8::new(1),
        }
    }

    /// Split into the two context handles.
    ///
    /// Borrowing mutably guarantees a single pair of handles exists.
    pub fn split(&mut self) -> (InterruptSide<'_>, ForegroundSide<'_>) {
        let state: &SharedState = self;
        (InterruptSide { state }, ForegroundSide { state })
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle owned by the interrupt handler
pub struct InterruptSide<'a> {
    state: &'a SharedState,
}

impl<'a> InterruptSide<'a> {
    pub fn tick_counter(&self) -> u16 {
        self.state.tick_counter.load(Ordering::Relaxed)
    }

    pub fn set_tick_counter(&self, value: u16) {
        self.state.tick_counter.store(value, Ordering::Relaxed);
    }

    /// Raise the event flag. An event already pending is overwritten.
    pub fn raise_event(&self) {
        self.state.event_flag.store(true, Ordering::Release);
    }

    pub fn accumulator(&self) -> u16 {
        self.state.accumulator.load(Ordering::Relaxed)
    }

    pub fn set_accumulator(&self, value: u16) {
        self.state.accumulator.store(value, Ordering::Relaxed);
    }

    pub fn increment(&self) -> u8 {
        self.state.increment.load(Ordering::Relaxed)
    }
}

/// Handle owned by the foreground loop
pub struct ForegroundSide<'a> {
    state: &'a SharedState,
}

impl<'a> ForegroundSide<'a> {
    pub fn event_pending(&self) -> bool {
        self.state.event_flag.load(Ordering::Acquire)
    }

    /// Clear the event flag after the event has been handled
    pub fn acknowledge_event(&self) {
        self.state.event_flag.store(false, Ordering::Relaxed);
    }

    /// Check for a pending event and acknowledge it.
    ///
    /// An event raised between the check and the clear is lost, which is the
    /// at-most-one-pending contract.
    pub fn take_event(&self) -> bool {
        if self.event_pending() {
            self.acknowledge_event();
            true
        } else {
            false
        }
    }

    pub fn set_increment(&self, increment: u8) {
        self.state.increment.store(increment, Ordering::Relaxed);
    }

    pub fn increment(&self) -> u8 {
        self.state.increment.load(Ordering::Relaxed)
    }

    /// Accumulator as last stored by the interrupt handler
    pub fn accumulator_snapshot(&self) -> u16 {
        self.state.accumulator.load(Ordering::Relaxed)
    }
}
