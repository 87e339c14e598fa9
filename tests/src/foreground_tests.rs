//! Foreground loop tests: LED walk, button toggling, loop pacing

#[cfg(test)]
mod tests {
    use tonegen_core::hal::mock::{MockDelay, MockIo, MockTimer};
    use tonegen_core::{
        default_phase_config, default_reload_config, Direction, LedWalker, PhaseController,
        ReloadController, SharedState, DEFAULT_DELAY_ITERATIONS,
    };

    fn noop_handler() {}

    #[test]
    fn test_led_walk_bounces_between_ends() {
        println!("\n=== LED walk ===");

        let config = default_phase_config();
        let mut state = SharedState::new();
        let (_isr, fg) = state.split();
        let mut controller = PhaseController::new(config);
        let mut io = MockIo::new();
        let mut timer = MockTimer::new();
        let mut delay = MockDelay::new();
        controller.start_timer(&mut timer, noop_handler).unwrap();

        let expected = [
            0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80, 0x40, 0x20, 0x10, 0x08, 0x04, 0x02, 0x01, 0x02,
        ];
        for &pattern in expected.iter() {
            let step = controller.step(&fg, &mut io, &mut timer, &mut delay).unwrap();
            assert_eq!(step.pattern, pattern);
            // Active low
            assert_eq!(io.port(config.pins.leds), !pattern);
        }
        assert_eq!(controller.walker().direction(), Direction::Left);
        println!("✓ 0x01 -> 0x80 -> 0x01 in 14 steps");
    }

    #[test]
    fn test_walker_never_dark() {
        let mut walker = LedWalker::new();
        for _ in 0..1000 {
            let pattern = walker.step();
            assert_eq!(pattern.count_ones(), 1);
        }
    }

    #[test]
    fn test_button_press_sequence() {
        println!("\n=== Flash button ===");

        let config = default_reload_config();
        let pins = config.pins;
        let mut controller = ReloadController::new(config);
        let mut io = MockIo::new();
        let mut timer = MockTimer::new();
        let mut delay = MockDelay::new();

        // Button level per loop iteration, high = released
        let levels = [true, false, false, true, true, false, true];
        let expected = [true, false, false, false, false, true, true];

        for (&level, &enabled) in levels.iter().zip(expected.iter()) {
            io.set_bit(pins.button, level);
            let step = controller.step(&mut io, &mut timer, &mut delay).unwrap();
            assert_eq!(step.flash_enabled, enabled);
            if !enabled {
                assert!(io.bit(pins.flash), "flash LED must be off while disabled");
            }
        }
        println!("✓ Two presses toggle flashing off and on");
    }

    #[test]
    fn test_flash_led_blinks_each_iteration_when_enabled() {
        let config = default_reload_config();
        let pins = config.pins;
        let mut controller = ReloadController::new(config);
        let mut io = MockIo::new();
        let mut timer = MockTimer::new();
        let mut delay = MockDelay::new();
        io.set_bit(pins.button, true);

        let mut levels = Vec::new();
        for _ in 0..6 {
            controller.step(&mut io, &mut timer, &mut delay).unwrap();
            levels.push(io.bit(pins.flash));
        }

        assert_eq!(levels, vec![true, false, true, false, true, false]);
    }

    #[test]
    fn test_loop_paced_by_delay_iterations() {
        let config = default_phase_config();
        let mut state = SharedState::new();
        let (_isr, fg) = state.split();
        let mut controller = PhaseController::new(config);
        let mut io = MockIo::new();
        let mut timer = MockTimer::new();
        let mut delay = MockDelay::new();

        for _ in 0..10 {
            controller.step(&fg, &mut io, &mut timer, &mut delay).unwrap();
        }

        assert_eq!(delay.calls(), 10);
        assert_eq!(delay.total_iterations(), 10 * DEFAULT_DELAY_ITERATIONS as u64);
    }

    #[test]
    fn test_switch_bits_above_nibble_do_not_change_increment() {
        let config = default_phase_config();
        let mut state = SharedState::new();
        let (_isr, fg) = state.split();
        let mut controller = PhaseController::new(config);
        let mut io = MockIo::new();
        let mut timer = MockTimer::new();
        let mut delay = MockDelay::new();

        for high in [0x00u8, 0x10, 0x20, 0x40, 0x70] {
            io.set_port(config.pins.switches, high | 0x09);
            let step = controller.step(&fg, &mut io, &mut timer, &mut delay).unwrap();
            assert_eq!(step.increment, 10);
            assert!(!step.interrupt_enabled);
        }
        assert_eq!(fg.increment(), 10);
    }
}
