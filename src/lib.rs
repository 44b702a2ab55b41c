//! Firmware core for a battery-powered motion-activity sensor node.
//!
//! # Overview
//!
//! The node drives an ADXL362 accelerometer over SPI, detects motion via
//! the sensor's latched activity interrupt, and spends the overwhelming
//! majority of its time in a deep-sleep energy mode, waking only on a
//! periodic timer or an external event:
//!
//! - Two push buttons and the accelerometer's INT1 line arm edge-triggered
//!   wake interrupts
//! - A low-frequency compare timer bounds the maximum sleep duration
//! - A single atomic event flag is the only data crossing the
//!   interrupt/foreground boundary
//! - The foreground loop alternates ACTIVE servicing and deep sleep,
//!   acknowledging the sensor's latched interrupt on every flagged wake
//!
//! # Hardware Abstraction
//!
//! Everything chip-specific sits behind small traits: [`wake::WakePort`]
//! for GPIO interrupt configuration, [`rtc::CompareTimer`] for the wake
//! timer, [`power::NodeHal`] for the power transition, and the
//! `embedded-hal` bus traits under the sensor driver. The `stm32l0`
//! feature provides the one concrete implementation, for the STM32L031;
//! the core itself builds and tests on any target.
//!
//! # Module Organization
//!
//! - [`event`] - wake events and the shared interrupt-to-foreground flag
//! - [`wake`] - wake-source (button and motion line) configuration
//! - [`rtc`] - periodic wake timer and compare-value derivation
//! - [`config`] - sensor parameters and their pure bitfield encodings
//! - [`adxl362`] - register-protocol driver for the accelerometer
//! - [`power`] - boot sequence and the active/sleep state machine
//! - [`board`] - STM32L031 pin map, EXTI handlers and STOP-mode support
//!   (feature `stm32l0`)

#![no_std]

pub mod adxl362;
#[cfg(feature = "stm32l0")]
pub mod board;
pub mod config;
pub mod event;
pub mod power;
pub mod rtc;
pub mod wake;

pub use adxl362::{Adxl362, Status};
pub use config::{OutputDataRate, Range, SensorConfig};
pub use event::{Button, EventFlag, WakeEvent};
pub use power::{BootError, NodeHal, PowerState, PowerStateMachine, boot};
