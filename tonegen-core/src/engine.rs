//! Interrupt-side frequency engines
//!
//! Each engine is the body of the timer interrupt for one deployment:
//!
//! - [`FixedCountEngine`]: counts ticks and raises the event flag
//! - [`PhaseAccumulatorEngine`]: modulo-256 phase accumulator driving the
//!   square-wave pin
//! - [`ReloadToggleEngine`]: toggles the square-wave pin on every expiry;
//!   the frequency lives entirely in the timer reload value

use crate::hal::{DigitalIo, InterruptAck, InterruptHandler};
use crate::shared::InterruptSide;
use crate::types::Pin;

/// Overflow-detect bits of the accumulator
const HIGH_BYTE: u16 = 0xFF00;
/// Modulo-256 mask
const LOW_BYTE: u16 = 0x00FF;

/// Raises the event flag once every `NUM_INTS + 1` ticks.
///
/// The comparison is `>` rather than `>=`: the counter reaches `NUM_INTS`
/// without firing and the flag goes up on the following tick.
pub struct FixedCountEngine<'a, const NUM_INTS: u16> {
    shared: InterruptSide<'a>,
}

impl<'a, const NUM_INTS: u16> FixedCountEngine<'a, NUM_INTS> {
    /// Ticks between two events
    pub const TICKS_PER_EVENT: u32 = NUM_INTS as u32 + 1;

    pub fn new(shared: InterruptSide<'a>) -> Self {
        Self { shared }
    }

    /// Count one tick. Returns true when the event flag was raised.
    pub fn tick(&mut self) -> bool {
        let count = self.shared.tick_counter().wrapping_add(1);
        if count > NUM_INTS {
            self.shared.set_tick_counter(0);
            self.shared.raise_event();
            true
        } else {
            self.shared.set_tick_counter(count);
            false
        }
    }
}

impl<'a, const NUM_INTS: u16> InterruptHandler for FixedCountEngine<'a, NUM_INTS> {
    fn on_interrupt(&mut self) {
        self.tick();
    }
}

/// Adds the foreground-selected increment every tick and toggles the output
/// when the sum passes 255.
pub struct PhaseAccumulatorEngine<'a, O> {
    shared: InterruptSide<'a>,
    io: O,
    output: Pin,
}

impl<'a, O> PhaseAccumulatorEngine<'a, O>
where
    O: DigitalIo,
{
    pub fn new(shared: InterruptSide<'a>, io: O, output: Pin) -> Self {
        Self { shared, io, output }
    }

    /// Advance the accumulator. Returns true on overflow.
    pub fn tick(&mut self) -> bool {
        let sum = self.shared.accumulator() + self.shared.increment() as u16;
        if sum & HIGH_BYTE != 0 {
            self.shared.set_accumulator(sum & LOW_BYTE);
            true
        } else {
            self.shared.set_accumulator(sum);
            false
        }
    }

    pub fn io(&self) -> &O {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut O {
        &mut self.io
    }
}

impl<'a, O> InterruptHandler for PhaseAccumulatorEngine<'a, O>
where
    O: DigitalIo,
{
    fn on_interrupt(&mut self) {
        if self.tick() {
            self.io.toggle_bit(self.output).ok();
        }
    }
}

/// Toggles the output and acknowledges the timer on every expiry
pub struct ReloadToggleEngine<O, A> {
    io: O,
    ack: A,
    output: Pin,
}

impl<O, A> ReloadToggleEngine<O, A>
where
    O: DigitalIo,
    A: InterruptAck,
{
    pub fn new(io: O, ack: A, output: Pin) -> Self {
        Self { io, ack, output }
    }

    pub fn io(&self) -> &O {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut O {
        &mut self.io
    }
}

impl<O, A> InterruptHandler for ReloadToggleEngine<O, A>
where
    O: DigitalIo,
    A: InterruptAck,
{
    fn on_interrupt(&mut self) {
        self.io.toggle_bit(self.output).ok();
        self.ack.acknowledge();
    }
}
