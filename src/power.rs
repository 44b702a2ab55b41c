//! Power state machine alternating active servicing and deep sleep.
//!
//! # Duty Cycle
//!
//! The node spends almost all of its time in the deep-sleep energy mode.
//! The foreground loop runs a two-state machine:
//!
//! 1. `Active → Active`: indicate liveness, and if the event flag is set,
//!    acknowledge the sensor's latched interrupt and clear the flag.
//! 2. `Active → Sleeping`: stop the liveness tick, power down the sensor
//!    bus pins, halt the CPU in the deep-sleep energy mode.
//! 3. `Sleeping → Active`: any unmasked interrupt (button, motion or
//!    timer) resumes execution; bus pins and tick come back up and the
//!    loop continues at step 1.
//!
//! The wake reason is deliberately not distinguished: treating all three
//! sources uniformly keeps the transition logic single-path, with no
//! divergent recovery code per source.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::adxl362::{Adxl362, Error, Status};
use crate::config::SensorConfig;
use crate::event::EventFlag;
use crate::rtc::{CompareTimer, TimerFault, arm_periodic};
use crate::wake::{WakePort, arm_wake_sources};

/// Chip capabilities the state machine needs across the power transition.
/// One implementation per chip family; the machine never touches hardware
/// except through this trait.
pub trait NodeHal {
    /// Gives a visible liveness indication for one active tick.
    fn indicate_liveness(&mut self);

    /// Starts or stops the periodic scheduling tick behind the liveness
    /// indication. Stopped across deep sleep; the tick's clock is among
    /// those the energy mode suspends.
    fn set_liveness_tick(&mut self, enabled: bool);

    /// Powers the sensor bus pins up or down. They leak current while the
    /// bus master is halted, and must never be driven while down.
    fn set_bus_pins(&mut self, enabled: bool);

    /// Enters the deep-sleep energy mode. Blocks until any unmasked
    /// interrupt fires; the handler runs, returns, and execution resumes
    /// here.
    fn enter_deep_sleep(&mut self);
}

/// Read-and-clear interrupt acknowledgment on the motion sensor.
pub trait MotionSensor {
    /// Bus-level error type.
    type Error;

    /// Reads the status register, clearing the device's latched interrupt
    /// condition as a side effect.
    fn acknowledge_interrupt(&mut self) -> Result<Status, Self::Error>;
}

/// The node's power state. Exactly one instance exists, owned and mutated
/// only by [`PowerStateMachine`] in the single foreground thread of
/// control.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Awake, servicing events.
    #[default]
    Active,
    /// CPU halted in the deep-sleep energy mode.
    Sleeping,
}

/// The main control loop's state. Starts [`PowerState::Active`] once boot
/// completes and cycles until power-off; there is no terminal state.
#[derive(Default)]
pub struct PowerStateMachine {
    state: PowerState,
}

impl PowerStateMachine {
    /// Creates the machine in the active state.
    pub fn new() -> Self {
        Self {
            state: PowerState::Active,
        }
    }

    /// Current power state.
    pub fn state(&self) -> PowerState {
        self.state
    }

    /// One active tick: indicate liveness, then service a pending event.
    ///
    /// The flag is cleared only after the sensor's latched condition has
    /// been acknowledged; a wake raised during the acknowledge merges into
    /// the next cycle instead of being lost. A failed status read is
    /// absorbed: the bus has no error detection, and the sensor stays
    /// latched until the next wake services it.
    pub fn service<H, S>(&mut self, hal: &mut H, sensor: &mut S, flag: &EventFlag)
    where
        H: NodeHal,
        S: MotionSensor,
    {
        hal.indicate_liveness();
        if flag.is_set() {
            match sensor.acknowledge_interrupt() {
                Ok(_status) => {
                    #[cfg(feature = "defmt")]
                    defmt::trace!("wake event acknowledged");
                }
                Err(_) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("status read failed, sensor may stay latched");
                }
            }
            flag.clear();
        }
    }

    /// One full sleep transition: park the peripherals, halt, re-arm.
    ///
    /// Blocks inside [`NodeHal::enter_deep_sleep`] until a wake interrupt
    /// fires. The bus pins are down for the whole halt, so no bus access
    /// may happen between the two halves of this function.
    pub fn sleep<H: NodeHal>(&mut self, hal: &mut H) {
        hal.set_liveness_tick(false);
        hal.set_bus_pins(false);
        self.state = PowerState::Sleeping;

        hal.enter_deep_sleep();

        self.state = PowerState::Active;
        hal.set_bus_pins(true);
        hal.set_liveness_tick(true);
    }

    /// Runs the duty cycle forever.
    pub fn run<H, S>(&mut self, hal: &mut H, sensor: &mut S, flag: &EventFlag) -> !
    where
        H: NodeHal,
        S: MotionSensor,
    {
        loop {
            self.service(hal, sensor, flag);
            self.sleep(hal);
        }
    }
}

/// Boot failure. The caller decides whether to halt, reset or report;
/// the core contains no infinite-wait control flow of its own.
#[derive(Debug)]
pub enum BootError<E> {
    /// The periodic wake timer could not be armed.
    Timer(TimerFault),
    /// A sensor bus operation failed during bring-up.
    Sensor(E),
}

/// Runs the boot sequence and hands back the machine ready to run.
///
/// Order matters: the wake timer is armed first so a sleep entered by an
/// early wake is always bounded, then the wake lines, then the sensor is
/// reset, configured in standby and finally switched to measurement.
/// Wake handlers may fire from `arm_wake_sources` onwards; they only
/// touch the event flag, so the remaining bring-up is safe to finish.
pub fn boot<P, T, SPI, CS, D>(
    port: &mut P,
    timer: &mut T,
    wake_interval_secs: u32,
    timer_clock_hz: u32,
    sensor: &mut Adxl362<SPI, CS, D>,
    config: &SensorConfig,
) -> Result<PowerStateMachine, BootError<Error<SPI::Error>>>
where
    P: WakePort,
    T: CompareTimer,
    SPI: SpiBus<u8>,
    CS: OutputPin,
    D: DelayNs,
{
    arm_periodic(timer, wake_interval_secs, timer_clock_hz).map_err(BootError::Timer)?;
    arm_wake_sources(port);

    sensor.reset().map_err(BootError::Sensor)?;
    sensor.configure(config).map_err(BootError::Sensor)?;
    sensor.enable_measurement(true).map_err(BootError::Sensor)?;

    Ok(PowerStateMachine::new())
}
