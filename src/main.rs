//! Firmware entry point for the motion-activity sensor node.
//!
//! # Overview
//!
//! A battery-powered node built around an ADXL362 accelerometer:
//! - Deep sleep (STOP mode) nearly all of the time
//! - Wakes on two buttons, the accelerometer's activity interrupt, or a
//!   periodic RTC timer bounding the sleep duration
//! - One LED pulse per wake as the liveness signal
//!
//! # Hardware
//!
//! - **MCU**: STM32L031G6U6 (Cortex-M0+, ultra-low-power)
//! - **Sensor**: ADXL362 micropower accelerometer on SPI1
//! - **RTC**: 32.768 kHz crystal for the wake-up timer in STOP mode
//!
//! # Low Power Operation
//!
//! - MSI oscillator at 65.536 kHz for minimal active current
//! - SPI pins parked as analog inputs across every sleep
//! - WFI with SLEEPDEEP set halts everything but the wake-capable subset

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use embassy_stm32::{
    Config,
    rcc::{LsConfig, LseConfig, mux::ClockMux},
    time::Hertz,
};
use {defmt_rtt as _, panic_probe as _};

use motion_node::board::{Board, WAKE_FLAG, WAKE_TIMER_HZ};
use motion_node::config::{OutputDataRate, Range, SensorConfig};
use motion_node::power;

/// Ceiling on sleep duration: the RTC wake-up timer fires this often
/// regardless of button or motion activity.
const WAKE_INTERVAL_SECS: u32 = 60;

/// Boot-time sensor configuration.
const SENSOR_CONFIG: SensorConfig = SensorConfig {
    range: Range::G4,
    odr: OutputDataRate::Hz12_5,
    activity_threshold_mg: 3000,
};

/// Low-power clock configuration: MSI system clock, no PLL, LSE for the
/// RTC, lowest voltage range.
fn low_power_clock_config() -> embassy_stm32::rcc::Config {
    embassy_stm32::rcc::Config {
        msi: Some(embassy_stm32::rcc::MSIRange::RANGE66K),
        hsi: false,
        hse: None,
        pll: None,
        sys: embassy_stm32::rcc::Sysclk::MSI,
        ahb_pre: embassy_stm32::rcc::AHBPrescaler::DIV1,
        apb1_pre: embassy_stm32::rcc::APBPrescaler::DIV1,
        apb2_pre: embassy_stm32::rcc::APBPrescaler::DIV1,
        ls: LsConfig {
            rtc: embassy_stm32::rcc::RtcClockSource::LSE,
            lsi: false,
            lse: Some(LseConfig {
                frequency: Hertz::hz(32768),
                mode: embassy_stm32::rcc::LseMode::Oscillator(embassy_stm32::rcc::LseDrive::Low),
            }),
        },
        voltage_scale: embassy_stm32::rcc::VoltageScale::RANGE1,
        mux: ClockMux::default(),
    }
}

#[entry]
fn main() -> ! {
    let mut config = Config::default();
    config.rcc = low_power_clock_config();
    let p = embassy_stm32::init(config);
    let cp = cortex_m::Peripherals::take().unwrap();

    defmt::info!("motion node starting");

    let mut parts = Board::init(p, cp);

    let mut machine = match power::boot(
        &mut parts.board,
        &mut parts.timer,
        WAKE_INTERVAL_SECS,
        WAKE_TIMER_HZ,
        &mut parts.sensor,
        &SENSOR_CONFIG,
    ) {
        Ok(machine) => machine,
        // Without a bounded sleep duration or a reachable sensor there is
        // nothing useful left to run; report and halt.
        Err(_) => defmt::panic!("boot failed, halting"),
    };

    defmt::info!(
        "boot complete, wake interval {=u32} s, entering duty cycle",
        WAKE_INTERVAL_SECS
    );

    machine.run(&mut parts.board, &mut parts.sensor, &WAKE_FLAG)
}
