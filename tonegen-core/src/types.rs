//! Core data types and deployment configuration

/// Identifier of an 8-bit digital I/O port
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortId(pub u8);

/// A single bit on a port
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pin {
    pub port: PortId,
    pub bit: u8,
}

impl Pin {
    pub const fn new(port: PortId, bit: u8) -> Self {
        Self { port, bit }
    }

    /// Bit mask of this pin within its port
    pub const fn mask(&self) -> u8 {
        1 << (self.bit & 0x07)
    }
}

/// Walking direction of the LED pattern
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Towards bit 7
    Left,
    /// Towards bit 0
    Right,
}

impl Direction {
    pub const fn opposite(&self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Timer clock of the reference board (ADuC841 at 11.0592 MHz)
pub const REFERENCE_CLOCK_HZ: u32 = 11_059_200;

/// Loop count of the foreground delay, roughly 87 ms on the reference board
pub const DEFAULT_DELAY_ITERATIONS: u32 = 60_000;

/// Interrupts between events for the fixed-count engine
pub const DEFAULT_NUM_INTS: u16 = 11_059;

/// Output frequencies selectable by the 3-bit switch field
pub const REFERENCE_FREQUENCIES_HZ: [u32; 8] = [200, 300, 400, 600, 800, 1600, 2400, 3600];

/// Reload values for [`REFERENCE_FREQUENCIES_HZ`] at [`REFERENCE_CLOCK_HZ`]
pub const REFERENCE_RELOAD_TABLE: [u16; 8] =
    build_reload_table(REFERENCE_CLOCK_HZ, &REFERENCE_FREQUENCIES_HZ);

/// Reload value of an 8-bit auto-reload timer for a period in clock cycles.
///
/// The counter overflows at 256, so a period of `p` cycles needs `256 - p`.
/// Periods above 256 clamp to the longest one.
pub const fn timer8_reload(period_cycles: u16) -> u8 {
    256u32.saturating_sub(period_cycles as u32) as u8
}

/// Reload value of a 16-bit up-counting timer that interrupts at twice
/// `target_hz`, one interrupt per half period of the output.
/// A zero target or a half period beyond 16 bits gives the longest period.
pub const fn timer16_reload(clock_hz: u32, target_hz: u32) -> u16 {
    match clock_hz.checked_div(target_hz.saturating_mul(2)) {
        Some(half_period) if half_period <= 65_536 => (65_536 - half_period) as u16,
        _ => 0,
    }
}

pub const fn build_reload_table(clock_hz: u32, frequencies_hz: &[u32; 8]) -> [u16; 8] {
    let mut table = [0u16; 8];
    let mut i = 0;
    while i < 8 {
        table[i] = timer16_reload(clock_hz, frequencies_hz[i]);
        i += 1;
    }
    table
}

/// Port and pin assignment of a board
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinMap {
    /// Switch bank, read as a whole port
    pub switches: PortId,
    /// Active-low LED bank
    pub leds: PortId,
    /// Active-low push button
    pub button: Pin,
    /// Active-low LED flashed by the foreground loop
    pub flash: Pin,
    /// Square-wave output owned by the interrupt handler
    pub square_wave: Pin,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            switches: PortId(2),
            leds: PortId(0),
            button: Pin::new(PortId(3), 2),
            flash: Pin::new(PortId(3), 4),
            square_wave: Pin::new(PortId(3), 6),
        }
    }
}

fn check_timing(clock_hz: u32, period_cycles: u16) -> Result<(), &'static str> {
    if clock_hz == 0 {
        return Err("Clock frequency must be non-zero");
    }
    if period_cycles == 0 || period_cycles > 256 {
        return Err("Timer period must be between 1 and 256 cycles");
    }
    Ok(())
}

/// Fixed-count event deployment
#[derive(Copy, Clone, Debug)]
pub struct EventConfig {
    pub clock_hz: u32,
    /// Timer period in clock cycles (8-bit auto reload)
    pub period_cycles: u16,
    /// LED toggled by the foreground on each event
    pub led: Pin,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            clock_hz: REFERENCE_CLOCK_HZ,
            period_cycles: 250,
            led: Pin::new(PortId(3), 4),
        }
    }
}

impl EventConfig {
    pub fn new(clock_hz: u32, period_cycles: u16, led: Pin) -> Result<Self, &'static str> {
        check_timing(clock_hz, period_cycles)?;
        Ok(Self { clock_hz, period_cycles, led })
    }

    pub fn timer_reload(&self) -> u8 {
        timer8_reload(self.period_cycles)
    }

    /// Interrupt rate, truncated to whole hertz
    pub fn tick_hz(&self) -> u32 {
        self.clock_hz.checked_div(self.period_cycles as u32).unwrap_or(0)
    }

    /// Event rate in millihertz for a given threshold.
    ///
    /// The flag is raised once every `num_ints + 1` ticks.
    pub fn event_millihz(&self, num_ints: u16) -> u32 {
        let ticks = self.period_cycles as u64 * (num_ints as u64 + 1);
        (self.clock_hz as u64 * 1000).checked_div(ticks).unwrap_or(0) as u32
    }
}

/// Phase accumulator deployment
#[derive(Copy, Clone, Debug)]
pub struct PhaseConfig {
    pub clock_hz: u32,
    /// Timer period in clock cycles (8-bit auto reload)
    pub period_cycles: u16,
    pub delay_iterations: u32,
    pub pins: PinMap,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            clock_hz: REFERENCE_CLOCK_HZ,
            period_cycles: 108,
            delay_iterations: DEFAULT_DELAY_ITERATIONS,
            pins: PinMap::default(),
        }
    }
}

impl PhaseConfig {
    pub fn new(
        clock_hz: u32,
        period_cycles: u16,
        delay_iterations: u32,
        pins: PinMap,
    ) -> Result<Self, &'static str> {
        check_timing(clock_hz, period_cycles)?;
        Ok(Self {
            clock_hz,
            period_cycles,
            delay_iterations,
            pins,
        })
    }

    pub fn timer_reload(&self) -> u8 {
        timer8_reload(self.period_cycles)
    }

    pub fn tick_hz(&self) -> u32 {
        self.clock_hz.checked_div(self.period_cycles as u32).unwrap_or(0)
    }

    /// Square-wave frequency in millihertz for an increment.
    ///
    /// One toggle per 256/increment ticks, two toggles per cycle.
    pub fn output_millihz(&self, increment: u8) -> u32 {
        let num = self.clock_hz as u64 * 1000 * increment as u64;
        num.checked_div(self.period_cycles as u64 * 512).unwrap_or(0) as u32
    }
}

/// Lookup-table reload deployment
#[derive(Copy, Clone, Debug)]
pub struct ReloadConfig {
    pub clock_hz: u32,
    pub frequencies_hz: [u32; 8],
    pub delay_iterations: u32,
    pub pins: PinMap,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            clock_hz: REFERENCE_CLOCK_HZ,
            frequencies_hz: REFERENCE_FREQUENCIES_HZ,
            delay_iterations: DEFAULT_DELAY_ITERATIONS,
            pins: PinMap::default(),
        }
    }
}

impl ReloadConfig {
    pub fn new(
        clock_hz: u32,
        frequencies_hz: [u32; 8],
        delay_iterations: u32,
        pins: PinMap,
    ) -> Result<Self, &'static str> {
        if clock_hz == 0 {
            return Err("Clock frequency must be non-zero");
        }
        let mut previous = 0;
        for &hz in frequencies_hz.iter() {
            if hz <= previous {
                return Err("Frequencies must be non-zero and strictly increasing");
            }
            let half_period = clock_hz / hz / 2;
            if half_period == 0 || half_period > 65_536 {
                return Err("Frequency out of range for a 16-bit timer");
            }
            previous = hz;
        }

        Ok(Self {
            clock_hz,
            frequencies_hz,
            delay_iterations,
            pins,
        })
    }

    /// Reload values indexed by the frequency selector
    pub fn reload_table(&self) -> [u16; 8] {
        build_reload_table(self.clock_hz, &self.frequencies_hz)
    }
}
