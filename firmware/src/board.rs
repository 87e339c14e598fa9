//! CH32V203 register-level board support
//!
//! Logical 8-bit ports are windows onto the 16-bit GPIO banks:
//!
//! | Port | Bank  | Pins      | Use                                   |
//! |------|-------|-----------|---------------------------------------|
//! | P0   | GPIOB | PB8-PB15  | LEDs, active low                      |
//! | P2   | GPIOA | PA0-PA7   | DIP switches, pulled up               |
//! | P3   | GPIOB | PB0-PB7   | PB2 button, PB4 flash LED, PB6 output |
//!
//! SYSCLK runs from an 11.0592 MHz crystal and TIM2 counts every clock, so
//! one timer count is one cycle of the reference clock the reload values
//! are derived from.

use core::cell::Cell;
use critical_section::Mutex;
use portable_atomic::{AtomicBool, Ordering};
use tonegen_core::hal::{DigitalIo, HalError, InterruptAck, IsrFn, TimerMode, TimerPeripheral};
use tonegen_core::{Pin, PortId, REFERENCE_CLOCK_HZ};

/// Core clock, from HSE
pub const SYSCLK_HZ: u32 = REFERENCE_CLOCK_HZ;
/// Timer counts once per core clock
const TIMER_PRESCALER: u32 = 1;

const RCC_BASE: u32 = 0x4002_1000;
const GPIOA_BASE: u32 = 0x4001_0800;
const GPIOB_BASE: u32 = 0x4001_0C00;
const TIM2_BASE: u32 = 0x4000_0000;
const PFIC_BASE: u32 = 0xE000_E000;

/// RCC register offsets
const RCC_CTLR: u32 = 0x00;
const RCC_CFGR0: u32 = 0x04;
const RCC_APB2PCENR: u32 = 0x18;
const RCC_APB1PCENR: u32 = 0x1C;

const RCC_HSEON: u32 = 1 << 16;
const RCC_HSERDY: u32 = 1 << 17;
const RCC_SW_MASK: u32 = 0b11;
const RCC_SW_HSE: u32 = 0b01;
const RCC_SWS_HSE: u32 = 0b01 << 2;
const RCC_IOPAEN: u32 = 1 << 2;
const RCC_IOPBEN: u32 = 1 << 3;
const RCC_TIM2EN: u32 = 1 << 0;

/// GPIO register offsets
const GPIO_CFGLR: u32 = 0x00;
const GPIO_CFGHR: u32 = 0x04;
const GPIO_INDR: u32 = 0x08;
const GPIO_OUTDR: u32 = 0x0C;
const GPIO_BSHR: u32 = 0x10;

/// Pin modes, one nibble per pin
const CFG_INPUT_PULL: u32 = 0x8;
const CFG_OUTPUT_PP_50MHZ: u32 = 0x3;

/// TIM2 register offsets
const TIM_CTLR1: u32 = 0x00;
const TIM_DMAINTENR: u32 = 0x0C;
const TIM_INTFR: u32 = 0x10;
const TIM_CNT: u32 = 0x24;
const TIM_PSC: u32 = 0x28;
const TIM_ATRLR: u32 = 0x2C;

const TIM_CEN: u32 = 1 << 0;
const TIM_ARPE: u32 = 1 << 7;
const TIM_UIE: u32 = 1 << 0;
const TIM_UIF: u32 = 1 << 0;

/// TIM2 global interrupt
const TIM2_IRQN: u32 = 44;
const PFIC_IENR: u32 = 0x100;
const PFIC_IRER: u32 = 0x180;

/// Handler installed by [`Tim2::register_handler`]
static TIMER_HANDLER: Mutex<Cell<Option<IsrFn>>> = Mutex::new(Cell::new(None));
/// Emulate the self-clearing flag of the 8-bit auto-reload mode
static AUTO_CLEAR: AtomicBool = AtomicBool::new(false);

#[inline(always)]
fn read_reg(addr: u32) -> u32 {
    unsafe { core::ptr::read_volatile(addr as *const u32) }
}

#[inline(always)]
fn write_reg(addr: u32, value: u32) {
    unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
}

fn modify_reg(addr: u32, f: impl FnOnce(u32) -> u32) {
    write_reg(addr, f(read_reg(addr)));
}

/// Switch SYSCLK to the crystal and enable the GPIO and timer clocks
pub fn init_clocks() {
    modify_reg(RCC_BASE + RCC_CTLR, |v| v | RCC_HSEON);
    while read_reg(RCC_BASE + RCC_CTLR) & RCC_HSERDY == 0 {}

    modify_reg(RCC_BASE + RCC_CFGR0, |v| (v & !RCC_SW_MASK) | RCC_SW_HSE);
    while read_reg(RCC_BASE + RCC_CFGR0) & (RCC_SW_MASK << 2) != RCC_SWS_HSE {}

    modify_reg(RCC_BASE + RCC_APB2PCENR, |v| v | RCC_IOPAEN | RCC_IOPBEN);
    modify_reg(RCC_BASE + RCC_APB1PCENR, |v| v | RCC_TIM2EN);
}

/// Configure the three logical ports and park every output at its idle level
pub fn init_gpio() {
    // P2: switches with pull-ups
    write_reg(GPIOA_BASE + GPIO_CFGLR, nibbles(|_| CFG_INPUT_PULL));
    modify_reg(GPIOA_BASE + GPIO_OUTDR, |v| v | 0x00FF);

    // P3: PB4 and PB6 drive, the rest read
    write_reg(
        GPIOB_BASE + GPIO_CFGLR,
        nibbles(|pin| match pin {
            4 | 6 => CFG_OUTPUT_PP_50MHZ,
            _ => CFG_INPUT_PULL,
        }),
    );
    // P0: LEDs
    write_reg(GPIOB_BASE + GPIO_CFGHR, nibbles(|_| CFG_OUTPUT_PP_50MHZ));

    // Pull-ups on P3 inputs, flash LED and all P0 LEDs off
    write_reg(GPIOB_BASE + GPIO_BSHR, 0xFFFF);
    write_reg(GPIOB_BASE + GPIO_BSHR, 1 << (6 + 16));
}

fn nibbles(mode: impl Fn(u32) -> u32) -> u32 {
    (0..8).fold(0, |acc, pin| acc | (mode(pin) << (pin * 4)))
}

/// GPIO bank and bit offset behind a logical port
fn port_window(port: PortId) -> Result<(u32, u32), HalError> {
    match port.0 {
        0 => Ok((GPIOB_BASE, 8)),
        2 => Ok((GPIOA_BASE, 0)),
        3 => Ok((GPIOB_BASE, 0)),
        _ => Err(HalError::InvalidPort),
    }
}

/// Logical ports P0, P2 and P3.
///
/// Every write goes through BSHR, so bit operations issued from the timer
/// interrupt and the foreground loop never overwrite each other.
#[derive(Copy, Clone, Debug, Default)]
pub struct GpioPorts;

impl DigitalIo for GpioPorts {
    type Error = HalError;

    fn read_port(&mut self, port: PortId) -> Result<u8, Self::Error> {
        let (base, shift) = port_window(port)?;
        Ok((read_reg(base + GPIO_INDR) >> shift) as u8)
    }

    fn write_port(&mut self, port: PortId, value: u8) -> Result<(), Self::Error> {
        let (base, shift) = port_window(port)?;
        let set = (value as u32) << shift;
        let reset = ((!value) as u32) << (shift + 16);
        write_reg(base + GPIO_BSHR, set | reset);
        Ok(())
    }

    fn write_bit(&mut self, pin: Pin, level: bool) -> Result<(), Self::Error> {
        let (base, shift) = port_window(pin.port)?;
        let bit = shift + pin.bit as u32;
        let value = if level { 1 << bit } else { 1 << (bit + 16) };
        write_reg(base + GPIO_BSHR, value);
        Ok(())
    }

    fn toggle_bit(&mut self, pin: Pin) -> Result<(), Self::Error> {
        let (base, shift) = port_window(pin.port)?;
        let bit = shift + pin.bit as u32;
        let high = read_reg(base + GPIO_OUTDR) & (1 << bit) != 0;
        self.write_bit(pin, !high)
    }
}

/// TIM2 as the tick timer
pub struct Tim2 {
    reload: u16,
    mode: Option<TimerMode>,
}

impl Tim2 {
    pub const fn new() -> Self {
        Self { reload: 0, mode: None }
    }

    /// Counts per expiry for a reload value in the current mode
    fn period(&self) -> u32 {
        match self.mode {
            Some(TimerMode::AutoReload8) => 256 - (self.reload & 0xFF) as u32,
            _ => 65536 - self.reload as u32,
        }
    }

    fn load_period(&self) {
        write_reg(TIM2_BASE + TIM_ATRLR, self.period() - 1);
    }
}

impl Default for Tim2 {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerPeripheral for Tim2 {
    type Error = HalError;

    fn configure(&mut self, mode: TimerMode, reload: u16) -> Result<(), Self::Error> {
        if mode == TimerMode::AutoReload8 && reload > 0xFF {
            return Err(HalError::InvalidConfig);
        }
        self.mode = Some(mode);
        self.reload = reload;
        AUTO_CLEAR.store(mode == TimerMode::AutoReload8, Ordering::Relaxed);

        write_reg(TIM2_BASE + TIM_PSC, TIMER_PRESCALER - 1);
        self.load_period();
        write_reg(TIM2_BASE + TIM_CNT, 0);
        modify_reg(TIM2_BASE + TIM_CTLR1, |v| v | TIM_ARPE);
        Ok(())
    }

    fn write_reload_low(&mut self, value: u8) -> Result<(), Self::Error> {
        self.reload = (self.reload & 0xFF00) | value as u16;
        self.load_period();
        Ok(())
    }

    fn write_reload_high(&mut self, value: u8) -> Result<(), Self::Error> {
        self.reload = (self.reload & 0x00FF) | ((value as u16) << 8);
        self.load_period();
        Ok(())
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        if self.mode.is_none() {
            return Err(HalError::NotInitialized);
        }
        modify_reg(TIM2_BASE + TIM_CTLR1, |v| v | TIM_CEN);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        modify_reg(TIM2_BASE + TIM_CTLR1, |v| v & !TIM_CEN);
        Ok(())
    }

    fn enable_interrupt(&mut self) -> Result<(), Self::Error> {
        modify_reg(TIM2_BASE + TIM_DMAINTENR, |v| v | TIM_UIE);
        write_reg(PFIC_BASE + PFIC_IENR + 4 * (TIM2_IRQN / 32), 1 << (TIM2_IRQN % 32));
        Ok(())
    }

    fn disable_interrupt(&mut self) -> Result<(), Self::Error> {
        write_reg(PFIC_BASE + PFIC_IRER + 4 * (TIM2_IRQN / 32), 1 << (TIM2_IRQN % 32));
        modify_reg(TIM2_BASE + TIM_DMAINTENR, |v| v & !TIM_UIE);
        Ok(())
    }

    fn register_handler(&mut self, handler: IsrFn) -> Result<(), Self::Error> {
        critical_section::with(|cs| TIMER_HANDLER.borrow(cs).set(Some(handler)));
        Ok(())
    }
}

/// Clears the TIM2 update flag
#[derive(Copy, Clone, Debug, Default)]
pub struct Tim2Ack;

impl InterruptAck for Tim2Ack {
    fn acknowledge(&mut self) {
        // rc_w0: writing 1 leaves the other flags alone
        write_reg(TIM2_BASE + TIM_INTFR, !TIM_UIF);
    }
}

#[no_mangle]
extern "C" fn TIM2_IRQHandler() {
    if AUTO_CLEAR.load(Ordering::Relaxed) {
        Tim2Ack.acknowledge();
    }
    let handler = critical_section::with(|cs| TIMER_HANDLER.borrow(cs).get());
    if let Some(handler) = handler {
        handler();
    }
}
