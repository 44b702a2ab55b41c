//! STM32L031 board support: pin mapping, EXTI wake lines, RTC wake-up
//! timer and the STOP-mode implementation of the core's hardware traits.
//!
//! # Pin Assignments
//!
//! ## Sensor Bus (SPI1)
//! - **PA5**: SCK
//! - **PA6**: MISO
//! - **PA7**: MOSI
//! - **PA4**: NCS - chip select, driven as a plain GPIO
//! - **PA1**: SENSOR_VCC - accelerometer supply rail
//!
//! ## Wake Lines
//! - **PB1**: ADXL_INT1 - accelerometer activity interrupt (EXTI1)
//! - **PB4**: PB0 button, active low (EXTI4)
//! - **PB5**: PB1 button, active low (EXTI5)
//!
//! ## Indication
//! - **PB0**: LED0 - liveness pulse
//!
//! ## Low Power & RTC
//! - **PC14**: OSC32_IN - 32.768 kHz crystal input
//! - **PC15**: OSC32_OUT - 32.768 kHz crystal output
//!
//! # Wake Path
//!
//! EXTI and the RTC wake-up timer are configured at pac level; their
//! interrupt handlers raise [`WAKE_FLAG`] and return. The foreground loop
//! in [`crate::power`] consumes the flag after WFI brings the core back
//! out of STOP mode.

use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::mode::Blocking;
use embassy_stm32::pac;
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::Hertz;
use embassy_time::{Delay, Duration, block_for};
use pac::interrupt;
use portable_atomic::{AtomicU32, Ordering};

use crate::adxl362::Adxl362;
use crate::event::{Button, EventFlag, WakeEvent};
use crate::power::NodeHal;
use crate::rtc::{CompareTimer, TimerFault};
use crate::wake::{Edge, WakeLine, WakePort};

/// Wake flag shared with the EXTI and RTC interrupt handlers.
pub static WAKE_FLAG: EventFlag = EventFlag::new();

/// RTC wake-up timer clock: ck_spre, 1 Hz derived from the 32.768 kHz LSE.
pub const WAKE_TIMER_HZ: u32 = 1;

/// EXTI line numbers for the wake inputs (all on port B).
const EXTI_MOTION: usize = 1;
const EXTI_BUTTON_A: usize = 4;
const EXTI_BUTTON_B: usize = 5;
/// RTC wake-up events reach the NVIC through EXTI line 20.
const EXTI_RTC_WAKEUP: usize = 20;

/// Register bank index for EXTI lines 0-31.
const EXTI_BANK: usize = 0;
/// SYSCFG EXTICR port selector for GPIOB.
const EXTICR_PORT_B: u8 = 1;

/// GPIOA pin numbers of the SPI1 signals parked across deep sleep.
const SPI_PINS: [usize; 3] = [5, 6, 7];

/// LED pulse width for one liveness indication.
const LED_PULSE_MS: u64 = 100;

/// SysTick reload for a 1 ms tick at the 65.536 kHz MSI core clock.
const SYSTICK_RELOAD: u32 = 65_536 / 1_000 - 1;

/// Milliseconds of active time since boot, kept by the SysTick handler
/// while the liveness tick is enabled.
static UPTIME_MS: AtomicU32 = AtomicU32::new(0);

/// Active-time milliseconds since boot.
pub fn uptime_ms() -> u32 {
    UPTIME_MS.load(Ordering::Relaxed)
}

#[cortex_m_rt::exception]
fn SysTick() {
    UPTIME_MS.fetch_add(1, Ordering::Relaxed);
}

fn exti_line(line: WakeLine) -> usize {
    match line {
        WakeLine::Button(Button::A) => EXTI_BUTTON_A,
        WakeLine::Button(Button::B) => EXTI_BUTTON_B,
        WakeLine::MotionInt => EXTI_MOTION,
    }
}

/// Board-level hardware behind the core's traits.
pub struct Board {
    led: Output<'static>,
    scb: cortex_m::peripheral::SCB,
    syst: cortex_m::peripheral::SYST,
    // Held so the pin configuration stays applied; the supply rail must
    // stay high and the inputs pulled for as long as the node runs.
    _sensor_power: Output<'static>,
    _button_a: Input<'static>,
    _button_b: Input<'static>,
    _motion_int: Input<'static>,
}

/// The sensor driver as wired on this board.
pub type BoardSensor = Adxl362<Spi<'static, Blocking>, Output<'static>, Delay>;

/// Everything [`Board::init`] hands back.
pub struct BoardParts {
    /// Implements [`NodeHal`] and [`WakePort`].
    pub board: Board,
    /// Accelerometer driver over SPI1.
    pub sensor: BoardSensor,
    /// RTC wake-up timer, [`CompareTimer`] at [`WAKE_TIMER_HZ`].
    pub timer: WakeTimer,
}

impl Board {
    /// Initializes all board hardware from the peripheral singletons.
    ///
    /// The sensor supply rail comes up first so the device is powered and
    /// settling while the rest of the pins are configured. SysTick is set
    /// up for the millisecond liveness tick but left stopped; the state
    /// machine starts it.
    pub fn init(p: embassy_stm32::Peripherals, mut cp: cortex_m::Peripherals) -> BoardParts {
        let sensor_power = Output::new(p.PA1, Level::High, Speed::Low);

        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(1_000_000);
        spi_config.mode = spi::MODE_0;
        let spi = Spi::new_blocking(p.SPI1, p.PA5, p.PA7, p.PA6, spi_config);
        let cs = Output::new(p.PA4, Level::High, Speed::Medium);

        cp.SYST
            .set_clock_source(cortex_m::peripheral::syst::SystClkSource::Core);
        cp.SYST.set_reload(SYSTICK_RELOAD);
        cp.SYST.clear_current();

        BoardParts {
            board: Board {
                led: Output::new(p.PB0, Level::Low, Speed::Low),
                scb: cp.SCB,
                syst: cp.SYST,
                _sensor_power: sensor_power,
                _button_a: Input::new(p.PB4, Pull::Up),
                _button_b: Input::new(p.PB5, Pull::Up),
                _motion_int: Input::new(p.PB1, Pull::None),
            },
            sensor: Adxl362::new(spi, cs, Delay),
            timer: WakeTimer,
        }
    }
}

impl WakePort for Board {
    fn configure_input(&mut self, line: WakeLine, _filtered: bool) {
        // The pins themselves were configured at init; this family has no
        // input glitch filter, buttons rely on the pull-up instead. What
        // remains is routing the pin to its EXTI line.
        let n = exti_line(line);
        pac::SYSCFG
            .exticr(n / 4)
            .modify(|w| w.set_exti(n % 4, EXTICR_PORT_B));
    }

    fn arm_edge(&mut self, line: WakeLine, edge: Edge) {
        let exti = pac::EXTI;
        let n = exti_line(line);
        match edge {
            Edge::Rising => exti.rtsr(EXTI_BANK).modify(|w| w.set_line(n, true)),
            Edge::Falling => exti.ftsr(EXTI_BANK).modify(|w| w.set_line(n, true)),
        }
        exti.imr(EXTI_BANK).modify(|w| w.set_line(n, true));
    }

    fn enable_interrupts(&mut self) {
        unsafe {
            cortex_m::peripheral::NVIC::unmask(embassy_stm32::interrupt::EXTI0_1);
            cortex_m::peripheral::NVIC::unmask(embassy_stm32::interrupt::EXTI4_15);
            cortex_m::peripheral::NVIC::unmask(embassy_stm32::interrupt::RTC);
        }
    }
}

impl NodeHal for Board {
    fn indicate_liveness(&mut self) {
        defmt::trace!("liveness pulse at {=u32} ms active time", uptime_ms());
        self.led.set_high();
        block_for(Duration::from_millis(LED_PULSE_MS));
        self.led.set_low();
    }

    fn set_liveness_tick(&mut self, enabled: bool) {
        if enabled {
            self.syst.enable_counter();
            self.syst.enable_interrupt();
        } else {
            self.syst.disable_interrupt();
            self.syst.disable_counter();
        }
    }

    fn set_bus_pins(&mut self, enabled: bool) {
        // Park the SPI signals as analog inputs while the bus master is
        // unclocked; left on the alternate function they leak through the
        // sensor's pull resistors.
        let mode = if enabled {
            pac::gpio::vals::Moder::ALTERNATE
        } else {
            pac::gpio::vals::Moder::ANALOG
        };
        for pin in SPI_PINS {
            pac::GPIOA.moder().modify(|w| w.set_moder(pin, mode));
        }
    }

    fn enter_deep_sleep(&mut self) {
        // PDDS keeps its reset value, so deep sleep means STOP, not
        // standby; the wake lines and RTC stay live.
        self.scb.set_sleepdeep();
        cortex_m::asm::wfi();
        self.scb.clear_sleepdeep();
    }
}

/// RTC wake-up timer clocked by ck_spre at 1 Hz from the LSE.
pub struct WakeTimer;

/// Iterations to wait for the wake-up timer write-enable flag before
/// declaring the LSE dead.
const WUTWF_BUDGET: u32 = 1_000_000;

impl CompareTimer for WakeTimer {
    fn arm(&mut self, compare_ticks: u32) -> Result<(), TimerFault> {
        let rtc = pac::RTC;

        // RTC registers sit in the backup domain.
        pac::PWR.cr().modify(|w| w.set_dbp(true));

        // Unlock the RTC write protection.
        rtc.wpr().write(|w| w.set_key(0xCA));
        rtc.wpr().write(|w| w.set_key(0x53));

        rtc.cr().modify(|w| w.set_wute(false));

        // Bounded wait for the reconfiguration window: a crystal that
        // never starts leaves WUTWF clear forever, and boot must fail
        // rather than hang.
        let mut budget = WUTWF_BUDGET;
        while !rtc.isr().read().wutwf() {
            budget -= 1;
            if budget == 0 {
                rtc.wpr().write(|w| w.set_key(0xFF));
                return Err(TimerFault);
            }
        }

        // The counter reloads WUT+1 clock cycles after enable.
        let reload = compare_ticks.saturating_sub(1).min(0xFFFF) as u16;
        rtc.wutr().write(|w| w.set_wut(reload));
        rtc.cr().modify(|w| {
            w.set_wucksel(pac::rtc::vals::Wucksel::CLOCK_SPARE);
            w.set_wutie(true);
            w.set_wute(true);
        });

        rtc.wpr().write(|w| w.set_key(0xFF));

        // Route the wake-up event through EXTI line 20, rising edge.
        let exti = pac::EXTI;
        exti.rtsr(EXTI_BANK).modify(|w| w.set_line(EXTI_RTC_WAKEUP, true));
        exti.imr(EXTI_BANK).modify(|w| w.set_line(EXTI_RTC_WAKEUP, true));

        Ok(())
    }
}

/// Accelerometer INT1 handler (EXTI line 1).
#[interrupt]
fn EXTI0_1() {
    let exti = pac::EXTI;
    if exti.pr(EXTI_BANK).read().line(EXTI_MOTION) {
        exti.pr(EXTI_BANK).write(|w| w.set_line(EXTI_MOTION, true));
        WAKE_FLAG.raise(WakeEvent::MotionDetected);
    }
}

/// Button handler (EXTI lines 4 and 5).
#[interrupt]
fn EXTI4_15() {
    let exti = pac::EXTI;
    let pending = exti.pr(EXTI_BANK).read();
    if pending.line(EXTI_BUTTON_A) {
        exti.pr(EXTI_BANK).write(|w| w.set_line(EXTI_BUTTON_A, true));
        WAKE_FLAG.raise(WakeEvent::ButtonPressed(Button::A));
    }
    if pending.line(EXTI_BUTTON_B) {
        exti.pr(EXTI_BANK).write(|w| w.set_line(EXTI_BUTTON_B, true));
        WAKE_FLAG.raise(WakeEvent::ButtonPressed(Button::B));
    }
}

/// RTC wake-up timer handler.
#[interrupt]
fn RTC() {
    pac::EXTI
        .pr(EXTI_BANK)
        .write(|w| w.set_line(EXTI_RTC_WAKEUP, true));
    // Clear the wake-up flag so the next period can latch it.
    pac::RTC.isr().modify(|w| w.set_wutf(false));
    WAKE_FLAG.raise(WakeEvent::TimerExpired);
}
