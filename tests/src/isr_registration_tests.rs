//! Zero-argument interrupt entry points over statically allocated state,
//! wired the same way as the firmware

#[cfg(test)]
mod tests {
    use core::cell::RefCell;
    use critical_section::Mutex;
    use static_cell::StaticCell;
    use tonegen_core::hal::mock::{MockDelay, MockIo, MockTimer};
    use tonegen_core::test_utils::simulator::SIM_OUTPUT;
    use tonegen_core::{
        default_event_config, default_phase_config, EventBlinker, FixedCountEngine,
        InterruptHandler, PhaseAccumulatorEngine, PhaseController, SharedState,
    };

    static EVENT_STATE: StaticCell<SharedState> = StaticCell::new();
    static EVENT_ENGINE: Mutex<RefCell<Option<FixedCountEngine<'static, 3>>>> =
        Mutex::new(RefCell::new(None));

    static PHASE_STATE: StaticCell<SharedState> = StaticCell::new();
    static PHASE_ENGINE: Mutex<RefCell<Option<PhaseAccumulatorEngine<'static, MockIo>>>> =
        Mutex::new(RefCell::new(None));

    fn event_isr() {
        critical_section::with(|cs| {
            if let Some(engine) = EVENT_ENGINE.borrow_ref_mut(cs).as_mut() {
                engine.on_interrupt();
            }
        });
    }

    fn phase_isr() {
        critical_section::with(|cs| {
            if let Some(engine) = PHASE_ENGINE.borrow_ref_mut(cs).as_mut() {
                engine.on_interrupt();
            }
        });
    }

    #[test]
    fn test_registered_event_isr() {
        let (isr, fg) = EVENT_STATE.init(SharedState::new()).split();
        critical_section::with(|cs| {
            EVENT_ENGINE.borrow_ref_mut(cs).replace(FixedCountEngine::new(isr));
        });

        let mut blinker = EventBlinker::new(default_event_config());
        let mut timer = MockTimer::new();
        let mut io = MockIo::new();
        blinker.start_timer(&mut timer, event_isr).unwrap();

        for _ in 0..3 {
            assert!(timer.expire());
        }
        assert!(!blinker.service(&fg, &mut io).unwrap());

        assert!(timer.expire());
        assert!(blinker.service(&fg, &mut io).unwrap());
        assert_eq!(blinker.events(), 1);
    }

    #[test]
    fn test_registered_phase_isr() {
        let (isr, fg) = PHASE_STATE.init(SharedState::new()).split();
        critical_section::with(|cs| {
            PHASE_ENGINE
                .borrow_ref_mut(cs)
                .replace(PhaseAccumulatorEngine::new(isr, MockIo::new(), SIM_OUTPUT));
        });

        let config = default_phase_config();
        let mut controller = PhaseController::new(config);
        let mut timer = MockTimer::new();
        controller.start_timer(&mut timer, phase_isr).unwrap();

        // Enable switch off: expiries are not taken
        assert!(!timer.expire());

        let mut io = MockIo::new();
        let mut delay = MockDelay::new();
        io.set_port(config.pins.switches, 0x8F);
        controller.step(&fg, &mut io, &mut timer, &mut delay).unwrap();

        for _ in 0..16 {
            assert!(timer.expire());
        }
        let level = critical_section::with(|cs| {
            PHASE_ENGINE
                .borrow_ref(cs)
                .as_ref()
                .map_or(false, |engine| engine.io().bit(SIM_OUTPUT))
        });
        assert!(level);
        assert_eq!(fg.accumulator_snapshot(), 0);
    }
}
