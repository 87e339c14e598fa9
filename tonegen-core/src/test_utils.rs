//! Test utilities for driving the engines without hardware

pub mod simulator {
    //! Interrupt simulation through a [`MockTimer`]

    use crate::engine::{FixedCountEngine, PhaseAccumulatorEngine};
    use crate::hal::mock::{MockIo, MockTimer};
    use crate::hal::{InterruptHandler, TimerMode, TimerPeripheral};
    use crate::shared::SharedState;
    use crate::types::{Pin, PortId};
    use heapless::Vec;

    /// Square-wave pin used by the simulated engines
    pub const SIM_OUTPUT: Pin = Pin::new(PortId(3), 6);

    /// A started 8-bit auto-reload timer with its interrupt enabled
    pub fn running_timer() -> MockTimer {
        let mut timer = MockTimer::new();
        timer.configure(TimerMode::AutoReload8, 148).ok();
        timer.start().ok();
        timer.enable_interrupt().ok();
        timer
    }

    /// Expire `timer` `ticks` times into `handler`.
    ///
    /// Returns the number of interrupts actually taken.
    pub fn run_ticks<H: InterruptHandler>(timer: &mut MockTimer, handler: &mut H, ticks: u32) -> u32 {
        (0..ticks).filter(|_| timer.expire_into(handler)).count() as u32
    }

    /// Tick numbers at which an output toggled
    #[derive(Debug, Default)]
    pub struct ToggleTrace<const N: usize> {
        now: u32,
        total: u32,
        toggles: Vec<u32, N>,
    }

    impl<const N: usize> ToggleTrace<N> {
        pub fn new() -> Self {
            Self {
                now: 0,
                total: 0,
                toggles: Vec::new(),
            }
        }

        /// Advance one tick, recording whether the output toggled on it
        pub fn tick(&mut self, toggled: bool) {
            self.now += 1;
            if toggled {
                self.total += 1;
                // Only the first N toggles keep their timestamp
                self.toggles.push(self.now).ok();
            }
        }

        pub fn ticks(&self) -> u32 {
            self.now
        }

        /// Every toggle, including those past capacity
        pub fn count(&self) -> u32 {
            self.total
        }

        pub fn toggle_ticks(&self) -> &[u32] {
            &self.toggles
        }

        /// Ticks between consecutive recorded toggles
        pub fn intervals(&self) -> Vec<u32, N> {
            self.toggles
                .windows(2)
                .map(|pair| pair[1] - pair[0])
                .collect()
        }
    }

    /// Run the phase accumulator through its interrupt path with a fixed
    /// increment and trace the square-wave pin.
    pub fn phase_trace<const N: usize>(increment: u8, ticks: u32) -> ToggleTrace<N> {
        let mut state = SharedState::new();
        let (isr, fg) = state.split();
        fg.set_increment(increment);

        let mut engine = PhaseAccumulatorEngine::new(isr, MockIo::new(), SIM_OUTPUT);
        let mut timer = running_timer();
        let mut trace = ToggleTrace::new();

        for _ in 0..ticks {
            let before = engine.io().bit(SIM_OUTPUT);
            timer.expire_into(&mut engine);
            trace.tick(engine.io().bit(SIM_OUTPUT) != before);
        }
        trace
    }

    /// Events seen by a foreground that polls every `poll_every` ticks
    /// (and once more at the end).
    pub fn fixed_count_events<const NUM_INTS: u16>(ticks: u32, poll_every: Option<u32>) -> u32 {
        let mut state = SharedState::new();
        let (isr, fg) = state.split();
        let mut engine = FixedCountEngine::<NUM_INTS>::new(isr);
        let mut timer = running_timer();
        let mut seen = 0;

        for tick in 1..=ticks {
            timer.expire_into(&mut engine);
            if let Some(period) = poll_every {
                if period > 0 && tick % period == 0 && fg.take_event() {
                    seen += 1;
                }
            }
        }
        if fg.take_event() {
            seen += 1;
        }
        seen
    }
}
