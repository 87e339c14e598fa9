//! Lookup-table reload and toggle tests

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tonegen_core::hal::mock::{MockDelay, MockIo, MockTimer};
    use tonegen_core::test_utils::simulator::run_ticks;
    use tonegen_core::{
        default_reload_config, timer16_reload, ReloadController, ReloadToggleEngine, TimerMode,
        REFERENCE_CLOCK_HZ,
    };

    fn noop_handler() {}

    #[rstest]
    #[case(0, 200, 37888)]
    #[case(1, 300, 47104)]
    #[case(2, 400, 51712)]
    #[case(3, 600, 56320)]
    #[case(4, 800, 58624)]
    #[case(5, 1600, 62080)]
    #[case(6, 2400, 63232)]
    #[case(7, 3600, 64000)]
    fn test_selector_loads_reload_and_toggles(#[case] selector: u8, #[case] hz: u32, #[case] reload: u16) {
        let config = default_reload_config();
        let pins = config.pins;
        let mut controller = ReloadController::new(config);
        let mut io = MockIo::new();
        let mut timer = MockTimer::new();
        let mut delay = MockDelay::new();

        assert_eq!(timer16_reload(REFERENCE_CLOCK_HZ, hz), reload);

        controller.start_timer(&mut timer, noop_handler).unwrap();
        io.set_port(pins.switches, 0xF8 | selector);
        let step = controller.step(&mut io, &mut timer, &mut delay).unwrap();
        assert_eq!(step.selector, selector);
        assert_eq!(timer.reload(), reload);
        assert_eq!(io.port(pins.leds), !(1u8 << selector));

        // One expiry: one edge on the output, flag cleared by the handler
        let mut engine = ReloadToggleEngine::new(MockIo::new(), timer.ack(), pins.square_wave);
        assert!(timer.expire_into(&mut engine));
        assert!(engine.io().bit(pins.square_wave));
        assert!(!timer.is_pending());
    }

    #[test]
    fn test_start_timer_uses_lowest_frequency() {
        let controller = ReloadController::new(default_reload_config());
        let mut timer = MockTimer::new();

        controller.start_timer(&mut timer, noop_handler).unwrap();

        assert_eq!(timer.mode(), Some(TimerMode::AutoReload16));
        assert_eq!(timer.reload(), 37888);
        assert!(timer.is_running());
        assert!(timer.interrupt_enabled());
    }

    #[test]
    fn test_toggle_engine_half_period_per_expiry() {
        let config = default_reload_config();
        let mut timer = MockTimer::new();
        ReloadController::new(config)
            .start_timer(&mut timer, noop_handler)
            .unwrap();

        let mut engine = ReloadToggleEngine::new(MockIo::new(), timer.ack(), config.pins.square_wave);
        assert_eq!(run_ticks(&mut timer, &mut engine, 10), 10);

        // Even number of half periods: back to the start level
        assert!(!engine.io().bit(config.pins.square_wave));
        assert_eq!(engine.io().write_count(config.pins.square_wave.port), 10);
        assert!(!timer.is_pending());
    }

    #[test]
    fn test_switch_change_rewrites_both_halves() {
        let config = default_reload_config();
        let pins = config.pins;
        let mut controller = ReloadController::new(config);
        let mut io = MockIo::new();
        let mut timer = MockTimer::new();
        let mut delay = MockDelay::new();

        io.set_port(pins.switches, 0x00);
        controller.step(&mut io, &mut timer, &mut delay).unwrap();
        io.set_port(pins.switches, 0x07);
        controller.step(&mut io, &mut timer, &mut delay).unwrap();

        // 37888 = 0x9400, 64000 = 0xFA00
        assert_eq!(
            timer.reload_writes(),
            &[(false, 0x00), (true, 0x94), (false, 0x00), (true, 0xFA)]
        );
        assert_eq!(delay.total_iterations(), 2 * config.delay_iterations as u64);
    }
}
