#![no_std]
#![no_main]

// Logging support
#[cfg(feature = "defmt")]
use defmt::{info, warn};
#[cfg(feature = "defmt")]
use defmt_rtt as _;
use panic_halt as _;

#[cfg(not(feature = "defmt"))]
macro_rules! info {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "defmt"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

#[cfg(any(
    all(feature = "variant-event", feature = "variant-phase"),
    all(feature = "variant-event", feature = "variant-reload"),
    all(feature = "variant-phase", feature = "variant-reload"),
))]
compile_error!("select exactly one of variant-event, variant-phase, variant-reload");

#[cfg(not(any(feature = "variant-event", feature = "variant-phase", feature = "variant-reload")))]
compile_error!("select one of variant-event, variant-phase, variant-reload");

mod board;

use core::cell::RefCell;
use critical_section::Mutex;
use riscv_rt::entry;
use tonegen_core::InterruptHandler;

use board::{GpioPorts, Tim2};

/// Length of one foreground delay iteration on the reference board
#[cfg(any(feature = "variant-phase", feature = "variant-reload"))]
const NS_PER_ITERATION: u32 = 1450;

// Critical section implementation for RISC-V
struct RiscvCriticalSection;
critical_section::set_impl!(RiscvCriticalSection);

unsafe impl critical_section::Impl for RiscvCriticalSection {
    unsafe fn acquire() -> critical_section::RawRestoreState {
        let mstatus = riscv::register::mstatus::read();
        riscv::register::mstatus::clear_mie();
        mstatus.mie() as u8
    }

    unsafe fn release(was_enabled: critical_section::RawRestoreState) {
        if was_enabled != 0 {
            riscv::register::mstatus::set_mie();
        }
    }
}

#[cfg(any(feature = "variant-event", feature = "variant-phase"))]
static SHARED_STATE: static_cell::StaticCell<tonegen_core::SharedState> = static_cell::StaticCell::new();

#[cfg(feature = "variant-event")]
type Engine = tonegen_core::FixedCountEngine<'static, { tonegen_core::DEFAULT_NUM_INTS }>;

#[cfg(feature = "variant-phase")]
type Engine = tonegen_core::PhaseAccumulatorEngine<'static, GpioPorts>;

#[cfg(feature = "variant-reload")]
type Engine = tonegen_core::ReloadToggleEngine<GpioPorts, board::Tim2Ack>;

/// Interrupt-side state, installed once before the timer starts
static ENGINE: Mutex<RefCell<Option<Engine>>> = Mutex::new(RefCell::new(None));

/// Registered with the timer; runs on every expiry
fn timer_tick() {
    critical_section::with(|cs| {
        if let Some(engine) = ENGINE.borrow_ref_mut(cs).as_mut() {
            engine.on_interrupt();
        }
    });
}

fn install(engine: Engine) {
    critical_section::with(|cs| {
        ENGINE.borrow_ref_mut(cs).replace(engine);
    });
}

/// Busy wait timed by the cycle counter
#[cfg(any(feature = "variant-phase", feature = "variant-reload"))]
fn foreground_delay() -> tonegen_core::hal::HalDelay<riscv::delay::McycleDelay> {
    tonegen_core::hal::HalDelay::new(riscv::delay::McycleDelay::new(board::SYSCLK_HZ), NS_PER_ITERATION)
}

#[entry]
fn main() -> ! {
    board::init_clocks();
    board::init_gpio();

    let mut io = GpioPorts;
    let mut timer = Tim2::new();

    info!("tonegen {}", tonegen_core::VERSION);

    #[cfg(feature = "variant-event")]
    {
        let (isr, fg) = SHARED_STATE.init(tonegen_core::SharedState::new()).split();
        let config = tonegen_core::default_event_config();
        let mut blinker = tonegen_core::EventBlinker::new(config);

        install(Engine::new(isr));
        if let Err(e) = blinker.start_timer(&mut timer, timer_tick) {
            warn!("timer start failed: {}", e);
        }
        unsafe { riscv::interrupt::enable() };
        info!("fixed-count event, {} mHz", config.event_millihz(tonegen_core::DEFAULT_NUM_INTS));

        loop {
            if let Err(e) = blinker.wait_and_toggle(&fg, &mut io, core::hint::spin_loop) {
                warn!("event handling failed: {}", e);
            }
        }
    }

    #[cfg(feature = "variant-phase")]
    {
        let (isr, fg) = SHARED_STATE.init(tonegen_core::SharedState::new()).split();
        let mut delay = foreground_delay();
        let config = tonegen_core::default_phase_config();
        let mut controller = tonegen_core::PhaseController::new(config);

        install(Engine::new(isr, GpioPorts, config.pins.square_wave));
        if let Err(e) = controller.start_timer(&mut timer, timer_tick) {
            warn!("timer start failed: {}", e);
        }
        unsafe { riscv::interrupt::enable() };
        info!("phase accumulator, tick {} Hz", config.tick_hz());

        loop {
            if let Err(e) = controller.step(&fg, &mut io, &mut timer, &mut delay) {
                warn!("loop step failed: {}", e);
            }
        }
    }

    #[cfg(feature = "variant-reload")]
    {
        let mut delay = foreground_delay();
        let config = tonegen_core::default_reload_config();
        let mut controller = tonegen_core::ReloadController::new(config);

        install(Engine::new(GpioPorts, board::Tim2Ack, config.pins.square_wave));
        if let Err(e) = controller.start_timer(&mut timer, timer_tick) {
            warn!("timer start failed: {}", e);
        }
        unsafe { riscv::interrupt::enable() };
        info!("reload table, {} Hz to {} Hz", config.frequencies_hz[0], config.frequencies_hz[7]);

        loop {
            if let Err(e) = controller.step(&mut io, &mut timer, &mut delay) {
                warn!("loop step failed: {}", e);
            }
        }
    }
}
