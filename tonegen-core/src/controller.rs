//! Foreground loop: input mapping, LED patterns, button edges and pacing

use crate::hal::{CoarseDelay, DigitalIo, IsrFn, TimerMode, TimerPeripheral};
use crate::shared::ForegroundSide;
use crate::types::{Direction, EventConfig, PhaseConfig, Pin, ReloadConfig};

/// Frequency selector bits of the switch port
pub const FREQ_MASK: u8 = 0x07;
/// Increment bits of the switch port
pub const LOW_NIBBLE: u8 = 0x0F;
/// Interrupt-enable switch
pub const TOP_BIT: u8 = 0x80;

/// Phase step per tick, 1..=16
pub const fn phase_increment(switches: u8) -> u8 {
    (switches & LOW_NIBBLE) + 1
}

/// Whether the enable switch allows the timer interrupt
pub const fn interrupt_enabled(switches: u8) -> bool {
    switches & TOP_BIT == TOP_BIT
}

/// Index into the reload table, 0..=7
pub const fn frequency_selector(switches: u8) -> u8 {
    switches & FREQ_MASK
}

/// Single set bit at the selector position
pub const fn one_hot(selector: u8) -> u8 {
    1 << (selector & FREQ_MASK)
}

/// Single lit LED bouncing between bit 0 and bit 7
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LedWalker {
    pattern: u8,
    direction: Direction,
}

impl LedWalker {
    pub const fn new() -> Self {
        Self {
            pattern: 0x01,
            direction: Direction::Left,
        }
    }

    /// Move one position, reversing at either end.
    ///
    /// A full round trip takes 14 calls.
    pub fn step(&mut self) -> u8 {
        let end = match self.direction {
            Direction::Left => {
                self.pattern <<= 1;
                0x80
            }
            Direction::Right => {
                self.pattern >>= 1;
                0x01
            }
        };
        if self.pattern == end {
            self.direction = self.direction.opposite();
        }
        self.pattern
    }

    pub fn pattern(&self) -> u8 {
        self.pattern
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl Default for LedWalker {
    fn default() -> Self {
        Self::new()
    }
}

/// Falling-edge detector for an active-low button.
///
/// Sampled once per loop iteration; the loop period is much longer than
/// contact bounce, so no further filtering is done.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ButtonEdge {
    last_level: bool,
}

impl ButtonEdge {
    pub const fn new() -> Self {
        Self { last_level: false }
    }

    /// Record the current level. Returns true on a 1 -> 0 transition.
    pub fn update(&mut self, level: bool) -> bool {
        let pressed = self.last_level && !level;
        self.last_level = level;
        pressed
    }
}

/// Fixed-count deployment: toggles an LED on every event
pub struct EventBlinker {
    config: EventConfig,
    events: u32,
}

impl EventBlinker {
    pub fn new(config: EventConfig) -> Self {
        Self { config, events: 0 }
    }

    /// 8-bit auto reload, interrupt enabled, running
    pub fn start_timer<T: TimerPeripheral>(&self, timer: &mut T, handler: IsrFn) -> Result<(), T::Error> {
        timer.configure(TimerMode::AutoReload8, self.config.timer_reload() as u16)?;
        timer.register_handler(handler)?;
        timer.start()?;
        timer.enable_interrupt()
    }

    /// Handle a pending event without blocking. Returns true if one was handled.
    pub fn service<IO: DigitalIo>(&mut self, fg: &ForegroundSide<'_>, io: &mut IO) -> Result<bool, IO::Error> {
        if !fg.event_pending() {
            return Ok(false);
        }
        self.handle(fg, io)?;
        Ok(true)
    }

    /// Spin until the interrupt raises the flag, then handle it.
    ///
    /// `spin` runs once per poll; pass `core::hint::spin_loop` on hardware.
    pub fn wait_and_toggle<IO, F>(&mut self, fg: &ForegroundSide<'_>, io: &mut IO, mut spin: F) -> Result<(), IO::Error>
    where
        IO: DigitalIo,
        F: FnMut(),
    {
        while !fg.event_pending() {
            spin();
        }
        self.handle(fg, io)
    }

    fn handle<IO: DigitalIo>(&mut self, fg: &ForegroundSide<'_>, io: &mut IO) -> Result<(), IO::Error> {
        io.toggle_bit(self.config.led)?;
        fg.acknowledge_event();
        self.events = self.events.wrapping_add(1);
        trace!("event {}", self.events);
        Ok(())
    }

    /// Events handled so far
    pub fn events(&self) -> u32 {
        self.events
    }
}

/// Result of one phase-accumulator foreground iteration
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PhaseStep {
    pub increment: u8,
    pub interrupt_enabled: bool,
    pub pattern: u8,
}

/// Phase-accumulator deployment: switches set the increment, a walking LED
/// pattern shows the loop is alive.
pub struct PhaseController {
    config: PhaseConfig,
    walker: LedWalker,
    last_increment: Option<u8>,
}

impl PhaseController {
    pub fn new(config: PhaseConfig) -> Self {
        Self {
            config,
            walker: LedWalker::new(),
            last_increment: None,
        }
    }

    /// 8-bit auto reload and running. The interrupt is enabled by the switch.
    pub fn start_timer<T: TimerPeripheral>(&self, timer: &mut T, handler: IsrFn) -> Result<(), T::Error> {
        timer.configure(TimerMode::AutoReload8, self.config.timer_reload() as u16)?;
        timer.register_handler(handler)?;
        timer.start()
    }

    /// One loop iteration: read switches, gate the interrupt, publish the
    /// increment, walk the LEDs, wait.
    pub fn step<IO, T, D>(
        &mut self,
        fg: &ForegroundSide<'_>,
        io: &mut IO,
        timer: &mut T,
        delay: &mut D,
    ) -> Result<PhaseStep, IO::Error>
    where
        IO: DigitalIo,
        T: TimerPeripheral<Error = IO::Error>,
        D: CoarseDelay,
    {
        let pins = self.config.pins;
        let switches = io.read_port(pins.switches)?;

        let enabled = interrupt_enabled(switches);
        if enabled {
            timer.enable_interrupt()?;
        } else {
            timer.disable_interrupt()?;
        }

        let increment = phase_increment(switches);
        fg.set_increment(increment);
        if self.last_increment != Some(increment) {
            debug!("increment {} ({} mHz)", increment, self.config.output_millihz(increment));
            self.last_increment = Some(increment);
        }

        let pattern = self.walker.step();
        // LEDs are active low
        io.write_port(pins.leds, !pattern)?;

        delay.busy_wait(self.config.delay_iterations);

        Ok(PhaseStep {
            increment,
            interrupt_enabled: enabled,
            pattern,
        })
    }

    pub fn walker(&self) -> &LedWalker {
        &self.walker
    }
}

/// Result of one lookup-table foreground iteration
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReloadStep {
    pub selector: u8,
    pub reload: u16,
    pub flash_enabled: bool,
}

/// Lookup-table deployment: switches pick a reload value, the button turns
/// LED flashing on and off.
pub struct ReloadController {
    config: ReloadConfig,
    table: [u16; 8],
    button: ButtonEdge,
    flash_enabled: bool,
    last_selector: Option<u8>,
}

impl ReloadController {
    pub fn new(config: ReloadConfig) -> Self {
        Self {
            table: config.reload_table(),
            config,
            button: ButtonEdge::new(),
            flash_enabled: true,
            last_selector: None,
        }
    }

    /// 16-bit auto reload starting at the lowest frequency, interrupt
    /// enabled, running
    pub fn start_timer<T: TimerPeripheral>(&self, timer: &mut T, handler: IsrFn) -> Result<(), T::Error> {
        timer.configure(TimerMode::AutoReload16, self.table[0])?;
        timer.register_handler(handler)?;
        timer.enable_interrupt()?;
        timer.start()
    }

    /// Reload value for a selector
    pub fn reload_for(&self, selector: u8) -> u16 {
        self.table[(selector & FREQ_MASK) as usize]
    }

    /// One loop iteration: select the reload value, show it on the LEDs,
    /// check the button, flash, wait.
    pub fn step<IO, T, D>(&mut self, io: &mut IO, timer: &mut T, delay: &mut D) -> Result<ReloadStep, IO::Error>
    where
        IO: DigitalIo,
        T: TimerPeripheral<Error = IO::Error>,
        D: CoarseDelay,
    {
        let pins = self.config.pins;
        let switches = io.read_port(pins.switches)?;

        let selector = frequency_selector(switches);
        let reload = self.reload_for(selector);
        timer.set_reload(reload)?;
        if self.last_selector != Some(selector) {
            debug!("selector {} -> {} Hz", selector, self.config.frequencies_hz[selector as usize]);
            self.last_selector = Some(selector);
        }

        io.write_port(pins.leds, !one_hot(selector))?;

        if self.button.update(io.read_bit(pins.button)?) {
            self.flash_enabled = !self.flash_enabled;
            debug!("flash {}", self.flash_enabled);
        }

        self.drive_flash(io, pins.flash)?;

        delay.busy_wait(self.config.delay_iterations);

        Ok(ReloadStep {
            selector,
            reload,
            flash_enabled: self.flash_enabled,
        })
    }

    fn drive_flash<IO: DigitalIo>(&self, io: &mut IO, pin: Pin) -> Result<(), IO::Error> {
        if self.flash_enabled {
            io.toggle_bit(pin)
        } else {
            // Active low: high is off
            io.write_bit(pin, true)
        }
    }

    pub fn flash_enabled(&self) -> bool {
        self.flash_enabled
    }
}
