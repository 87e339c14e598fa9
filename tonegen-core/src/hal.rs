//! Hardware Abstraction Layer for the timer, digital I/O and software delay

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, PinState, StatefulOutputPin};
use crate::types::{Pin, PortId};

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// Port is not handled by this I/O provider
    InvalidPort,
    /// Write to an input-only port
    ReadOnlyPort,
    /// Hardware not initialized
    NotInitialized,
    /// Invalid configuration
    InvalidConfig,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::InvalidPort => write!(f, "Port not available"),
            HalError::ReadOnlyPort => write!(f, "Port is read-only"),
            HalError::NotInitialized => write!(f, "Hardware not initialized"),
            HalError::InvalidConfig => write!(f, "Invalid configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Byte-wide digital I/O.
///
/// Bit operations must leave every other bit of the port unchanged. The
/// default implementations read-modify-write the whole port; providers with
/// single-bit set/reset registers should override them.
pub trait DigitalIo {
    type Error: From<HalError>;

    /// Read all 8 bits of a port
    fn read_port(&mut self, port: PortId) -> Result<u8, Self::Error>;

    /// Write all 8 bits of a port
    fn write_port(&mut self, port: PortId, value: u8) -> Result<(), Self::Error>;

    fn read_bit(&mut self, pin: Pin) -> Result<bool, Self::Error> {
        Ok(self.read_port(pin.port)? & pin.mask() != 0)
    }

    fn write_bit(&mut self, pin: Pin, level: bool) -> Result<(), Self::Error> {
        let value = self.read_port(pin.port)?;
        let value = if level { value | pin.mask() } else { value & !pin.mask() };
        self.write_port(pin.port, value)
    }

    /// Invert a single bit (read-modify-write)
    fn toggle_bit(&mut self, pin: Pin) -> Result<(), Self::Error> {
        let value = self.read_port(pin.port)?;
        self.write_port(pin.port, value ^ pin.mask())
    }
}

/// Counting mode of the tick timer
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerMode {
    /// 8-bit counter reloaded from the high byte; the pending flag is
    /// cleared by hardware when the interrupt is taken
    AutoReload8,
    /// 16-bit counter reloaded from a register pair; the handler must
    /// acknowledge the pending flag
    AutoReload16,
}

/// Zero-argument interrupt entry point
pub type IsrFn = fn();

/// Tick timer configuration, owned by the foreground context
pub trait TimerPeripheral {
    type Error: From<HalError>;

    /// Select the counting mode and initial reload value
    fn configure(&mut self, mode: TimerMode, reload: u16) -> Result<(), Self::Error>;

    fn write_reload_low(&mut self, value: u8) -> Result<(), Self::Error>;

    fn write_reload_high(&mut self, value: u8) -> Result<(), Self::Error>;

    /// Write a 16-bit reload value as two register writes, low half first.
    ///
    /// Not atomic with respect to the timer interrupt; the new value applies
    /// from the next reload.
    fn set_reload(&mut self, reload: u16) -> Result<(), Self::Error> {
        let [low, high] = reload.to_le_bytes();
        self.write_reload_low(low)?;
        self.write_reload_high(high)
    }

    fn start(&mut self) -> Result<(), Self::Error>;

    fn stop(&mut self) -> Result<(), Self::Error>;

    fn enable_interrupt(&mut self) -> Result<(), Self::Error>;

    fn disable_interrupt(&mut self) -> Result<(), Self::Error>;

    /// Install the function invoked on expiry
    fn register_handler(&mut self, handler: IsrFn) -> Result<(), Self::Error>;
}

/// Clears the timer's pending-interrupt flag from inside the handler
pub trait InterruptAck {
    fn acknowledge(&mut self);
}

/// Work done on every timer expiry.
///
/// Runs to completion in interrupt context and cannot fail.
pub trait InterruptHandler {
    fn on_interrupt(&mut self);
}

/// Calibrated busy wait used to pace the foreground loop.
///
/// Interrupts stay enabled while waiting.
pub trait CoarseDelay {
    fn busy_wait(&mut self, iterations: u32);
}

/// Eight `embedded-hal` input pins read as one port
pub struct InputBank<P, const N: usize> {
    port: PortId,
    pins: [P; N],
}

impl<P, const N: usize> InputBank<P, N>
where
    P: InputPin,
{
    /// Pin `i` of the array becomes bit `i` of the port
    pub fn new(port: PortId, pins: [P; N]) -> Self {
        Self { port, pins }
    }

    pub fn port(&self) -> PortId {
        self.port
    }

    /// Release the pins
    pub fn free(self) -> [P; N] {
        self.pins
    }
}

impl<P, const N: usize> DigitalIo for InputBank<P, N>
where
    P: InputPin,
{
    type Error = HalError;

    fn read_port(&mut self, port: PortId) -> Result<u8, Self::Error> {
        if port != self.port {
            return Err(HalError::InvalidPort);
        }
        let mut value = 0u8;
        for (bit, pin) in self.pins.iter_mut().enumerate().take(8) {
            if pin.is_high().map_err(|_| HalError::GpioError)? {
                value |= 1 << bit;
            }
        }
        Ok(value)
    }

    fn write_port(&mut self, _port: PortId, _value: u8) -> Result<(), Self::Error> {
        Err(HalError::ReadOnlyPort)
    }
}

/// Eight `embedded-hal` output pins driven as one port
pub struct OutputBank<P, const N: usize> {
    port: PortId,
    pins: [P; N],
}

impl<P, const N: usize> OutputBank<P, N>
where
    P: StatefulOutputPin,
{
    pub fn new(port: PortId, pins: [P; N]) -> Self {
        Self { port, pins }
    }

    pub fn port(&self) -> PortId {
        self.port
    }

    pub fn free(self) -> [P; N] {
        self.pins
    }

    fn pin_mut(&mut self, pin: Pin) -> Result<&mut P, HalError> {
        if pin.port != self.port {
            return Err(HalError::InvalidPort);
        }
        self.pins.get_mut(pin.bit as usize).ok_or(HalError::InvalidPort)
    }
}

impl<P, const N: usize> DigitalIo for OutputBank<P, N>
where
    P: StatefulOutputPin,
{
    type Error = HalError;

    fn read_port(&mut self, port: PortId) -> Result<u8, Self::Error> {
        if port != self.port {
            return Err(HalError::InvalidPort);
        }
        let mut value = 0u8;
        for (bit, pin) in self.pins.iter_mut().enumerate().take(8) {
            if pin.is_set_high().map_err(|_| HalError::GpioError)? {
                value |= 1 << bit;
            }
        }
        Ok(value)
    }

    fn write_port(&mut self, port: PortId, value: u8) -> Result<(), Self::Error> {
        if port != self.port {
            return Err(HalError::InvalidPort);
        }
        for (bit, pin) in self.pins.iter_mut().enumerate().take(8) {
            let state = PinState::from(value & (1 << bit) != 0);
            pin.set_state(state).map_err(|_| HalError::GpioError)?;
        }
        Ok(())
    }

    fn write_bit(&mut self, pin: Pin, level: bool) -> Result<(), Self::Error> {
        self.pin_mut(pin)?
            .set_state(PinState::from(level))
            .map_err(|_| HalError::GpioError)
    }

    fn toggle_bit(&mut self, pin: Pin) -> Result<(), Self::Error> {
        self.pin_mut(pin)?.toggle().map_err(|_| HalError::GpioError)
    }
}

/// An input bank and an output bank behind one [`DigitalIo`]
pub struct Board<I, O, const NI: usize, const NO: usize> {
    inputs: InputBank<I, NI>,
    outputs: OutputBank<O, NO>,
}

impl<I, O, const NI: usize, const NO: usize> Board<I, O, NI, NO>
where
    I: InputPin,
    O: StatefulOutputPin,
{
    pub fn new(inputs: InputBank<I, NI>, outputs: OutputBank<O, NO>) -> Self {
        Self { inputs, outputs }
    }

    pub fn free(self) -> (InputBank<I, NI>, OutputBank<O, NO>) {
        (self.inputs, self.outputs)
    }
}

impl<I, O, const NI: usize, const NO: usize> DigitalIo for Board<I, O, NI, NO>
where
    I: InputPin,
    O: StatefulOutputPin,
{
    type Error = HalError;

    fn read_port(&mut self, port: PortId) -> Result<u8, Self::Error> {
        if port == self.inputs.port() {
            self.inputs.read_port(port)
        } else {
            self.outputs.read_port(port)
        }
    }

    fn write_port(&mut self, port: PortId, value: u8) -> Result<(), Self::Error> {
        if port == self.inputs.port() {
            self.inputs.write_port(port, value)
        } else {
            self.outputs.write_port(port, value)
        }
    }

    fn write_bit(&mut self, pin: Pin, level: bool) -> Result<(), Self::Error> {
        if pin.port == self.inputs.port() {
            return Err(HalError::ReadOnlyPort);
        }
        self.outputs.write_bit(pin, level)
    }

    fn toggle_bit(&mut self, pin: Pin) -> Result<(), Self::Error> {
        if pin.port == self.inputs.port() {
            return Err(HalError::ReadOnlyPort);
        }
        self.outputs.toggle_bit(pin)
    }
}

/// [`CoarseDelay`] over an `embedded-hal` delay provider.
///
/// Each loop iteration is converted to a fixed number of nanoseconds, so the
/// foreground keeps the pacing of the counted loop on targets where the real
/// loop would be optimised away or run at a different speed.
pub struct HalDelay<D> {
    delay: D,
    ns_per_iteration: u32,
}

impl<D> HalDelay<D>
where
    D: DelayNs,
{
    pub fn new(delay: D, ns_per_iteration: u32) -> Self {
        Self {
            delay,
            ns_per_iteration,
        }
    }

    pub fn free(self) -> D {
        self.delay
    }
}

impl<D> CoarseDelay for HalDelay<D>
where
    D: DelayNs,
{
    fn busy_wait(&mut self, iterations: u32) {
        let total_ns = iterations as u64 * self.ns_per_iteration as u64;
        let us = total_ns / 1000;
        let rest = (total_ns % 1000) as u32;

        if us > 0 {
            self.delay.delay_us(us.min(u32::MAX as u64) as u32);
        }
        if rest > 0 {
            self.delay.delay_ns(rest);
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::vec::Vec;

    /// Number of ports on the mock board (P0-P3)
    pub const MOCK_PORTS: usize = 4;

    /// Four 8-bit ports held in memory
    #[derive(Debug, Default)]
    pub struct MockIo {
        ports: [u8; MOCK_PORTS],
        writes: [u32; MOCK_PORTS],
    }

    impl MockIo {
        pub fn new() -> Self {
            Self::default()
        }

        /// Drive an input level from outside, as a switch or button would
        pub fn set_port(&mut self, port: PortId, value: u8) {
            if let Some(slot) = self.ports.get_mut(port.0 as usize) {
                *slot = value;
            }
        }

        pub fn set_bit(&mut self, pin: Pin, level: bool) {
            let value = self.port(pin.port);
            let value = if level { value | pin.mask() } else { value & !pin.mask() };
            self.set_port(pin.port, value);
        }

        pub fn port(&self, port: PortId) -> u8 {
            self.ports.get(port.0 as usize).copied().unwrap_or(0)
        }

        pub fn bit(&self, pin: Pin) -> bool {
            self.port(pin.port) & pin.mask() != 0
        }

        /// Number of software writes to a port
        pub fn write_count(&self, port: PortId) -> u32 {
            self.writes.get(port.0 as usize).copied().unwrap_or(0)
        }
    }

    impl DigitalIo for MockIo {
        type Error = HalError;

        fn read_port(&mut self, port: PortId) -> Result<u8, Self::Error> {
            self.ports
                .get(port.0 as usize)
                .copied()
                .ok_or(HalError::InvalidPort)
        }

        fn write_port(&mut self, port: PortId, value: u8) -> Result<(), Self::Error> {
            let index = port.0 as usize;
            if index >= MOCK_PORTS {
                return Err(HalError::InvalidPort);
            }
            self.ports[index] = value;
            self.writes[index] += 1;
            Ok(())
        }
    }

    /// Timer with a software-driven expiry
    #[derive(Debug, Default)]
    pub struct MockTimer {
        mode: Option<TimerMode>,
        reload: u16,
        reload_writes: Vec<(bool, u8)>,
        running: bool,
        interrupt_enabled: bool,
        handler: Option<IsrFn>,
        pending: Rc<Cell<bool>>,
    }

    impl MockTimer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn mode(&self) -> Option<TimerMode> {
            self.mode
        }

        /// Reload value as the hardware would assemble it
        pub fn reload(&self) -> u16 {
            self.reload
        }

        /// Register writes in order, `(is_high_half, value)`
        pub fn reload_writes(&self) -> &[(bool, u8)] {
            &self.reload_writes
        }

        pub fn is_running(&self) -> bool {
            self.running
        }

        pub fn interrupt_enabled(&self) -> bool {
            self.interrupt_enabled
        }

        pub fn is_pending(&self) -> bool {
            self.pending.get()
        }

        /// Acknowledge handle for the interrupt side
        pub fn ack(&self) -> MockAck {
            MockAck {
                pending: self.pending.clone(),
            }
        }

        /// Counter overflow. Returns true when an interrupt would be taken.
        fn overflow(&mut self) -> bool {
            if !self.running {
                return false;
            }
            self.pending.set(true);
            if !self.interrupt_enabled {
                return false;
            }
            if self.mode == Some(TimerMode::AutoReload8) {
                // Cleared by hardware on vectoring
                self.pending.set(false);
            }
            true
        }

        /// Expire once and call the registered function
        pub fn expire(&mut self) -> bool {
            let taken = self.overflow();
            if taken {
                if let Some(handler) = self.handler {
                    handler();
                }
            }
            taken
        }

        /// Expire once and call `handler` in place of a registered function
        pub fn expire_into<H: InterruptHandler + ?Sized>(&mut self, handler: &mut H) -> bool {
            let taken = self.overflow();
            if taken {
                handler.on_interrupt();
            }
            taken
        }
    }

    impl TimerPeripheral for MockTimer {
        type Error = HalError;

        fn configure(&mut self, mode: TimerMode, reload: u16) -> Result<(), Self::Error> {
            if mode == TimerMode::AutoReload8 && reload > 0xFF {
                return Err(HalError::InvalidConfig);
            }
            self.mode = Some(mode);
            self.reload = reload;
            Ok(())
        }

        fn write_reload_low(&mut self, value: u8) -> Result<(), Self::Error> {
            self.reload = (self.reload & 0xFF00) | value as u16;
            self.reload_writes.push((false, value));
            Ok(())
        }

        fn write_reload_high(&mut self, value: u8) -> Result<(), Self::Error> {
            self.reload = (self.reload & 0x00FF) | ((value as u16) << 8);
            self.reload_writes.push((true, value));
            Ok(())
        }

        fn start(&mut self) -> Result<(), Self::Error> {
            if self.mode.is_none() {
                return Err(HalError::NotInitialized);
            }
            self.running = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), Self::Error> {
            self.running = false;
            Ok(())
        }

        fn enable_interrupt(&mut self) -> Result<(), Self::Error> {
            self.interrupt_enabled = true;
            Ok(())
        }

        fn disable_interrupt(&mut self) -> Result<(), Self::Error> {
            self.interrupt_enabled = false;
            Ok(())
        }

        fn register_handler(&mut self, handler: IsrFn) -> Result<(), Self::Error> {
            self.handler = Some(handler);
            Ok(())
        }
    }

    /// Pending-flag handle shared with a [`MockTimer`]
    #[derive(Debug, Clone)]
    pub struct MockAck {
        pending: Rc<Cell<bool>>,
    }

    impl InterruptAck for MockAck {
        fn acknowledge(&mut self) {
            self.pending.set(false);
        }
    }

    /// Records requested delays instead of waiting
    #[derive(Debug, Default)]
    pub struct MockDelay {
        calls: u32,
        total_iterations: u64,
    }

    impl MockDelay {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> u32 {
            self.calls
        }

        pub fn total_iterations(&self) -> u64 {
            self.total_iterations
        }
    }

    impl CoarseDelay for MockDelay {
        fn busy_wait(&mut self, iterations: u32) {
            self.calls += 1;
            self.total_iterations += iterations as u64;
        }
    }
}
