//! Foreground loops over `embedded-hal` pins instead of the mock ports

#[cfg(test)]
mod tests {
    use core::convert::Infallible;
    use embedded_hal::delay::DelayNs;
    use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};
    use embedded_hal_mock::eh1::pin::{Mock as PinMock, State, Transaction};
    use tonegen_core::hal::mock::MockTimer;
    use tonegen_core::hal::{Board, HalDelay, InputBank, OutputBank};
    use tonegen_core::{default_phase_config, PhaseController, PortId, SharedState};

    #[derive(Debug, Default)]
    struct LedPin {
        high: bool,
    }

    impl ErrorType for LedPin {
        type Error = Infallible;
    }

    impl OutputPin for LedPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            Ok(())
        }
    }

    impl StatefulOutputPin for LedPin {
        fn is_set_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.high)
        }

        fn is_set_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.high)
        }
    }

    #[derive(Debug, Default)]
    struct ElapsedDelay {
        ns: u64,
    }

    impl DelayNs for ElapsedDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.ns += ns as u64;
        }
    }

    /// One switch pin per bit, read `reads` times at the given port value
    fn switch_pins(value: u8, reads: usize) -> [PinMock; 8] {
        core::array::from_fn(|bit| {
            let state = if value & (1 << bit) != 0 { State::High } else { State::Low };
            let expectations: Vec<Transaction> = (0..reads).map(|_| Transaction::get(state)).collect();
            PinMock::new(&expectations)
        })
    }

    #[test]
    fn test_phase_loop_on_hal_pins() {
        println!("\n=== Phase loop over embedded-hal pins ===");

        let config = default_phase_config();
        assert_eq!(config.pins.switches, PortId(2));
        assert_eq!(config.pins.leds, PortId(0));

        let switches = InputBank::new(config.pins.switches, switch_pins(0x83, 3));
        let leds: OutputBank<LedPin, 8> = OutputBank::new(config.pins.leds, core::array::from_fn(|_| LedPin::default()));
        let mut board = Board::new(switches, leds);
        // 1.45 us per iteration
        let mut delay = HalDelay::new(ElapsedDelay::default(), 1450);

        let mut state = SharedState::new();
        let (_isr, fg) = state.split();
        let mut controller = PhaseController::new(config);
        let mut timer = MockTimer::new();

        let mut patterns = Vec::new();
        for _ in 0..3 {
            let step = controller.step(&fg, &mut board, &mut timer, &mut delay).unwrap();
            assert_eq!(step.increment, 4);
            assert!(step.interrupt_enabled);
            patterns.push(step.pattern);
        }
        assert_eq!(patterns, vec![0x02, 0x04, 0x08]);
        assert_eq!(fg.increment(), 4);
        assert!(timer.interrupt_enabled());

        let (inputs, outputs) = board.free();
        for mut pin in inputs.free() {
            pin.done();
        }
        let lit: Vec<usize> = outputs
            .free()
            .iter()
            .enumerate()
            .filter(|(_, pin)| !pin.high)
            .map(|(bit, _)| bit)
            .collect();
        // Active low: only bit 3 is driven low
        assert_eq!(lit, vec![3]);

        assert_eq!(delay.free().ns, 3 * 87_000_000);
        println!("✓ Three iterations, 87 ms each");
    }
}
