//! ADXL362 register protocol driver over a chip-select framed SPI bus.
//!
//! # Wire Protocol
//!
//! Every register access is one transaction framed by the chip-select line:
//!
//! - read: `{0x0B, address, dummy}`, the value arrives in the dummy slot
//! - write: `{0x0A, address, value}`
//!
//! Chip select stays asserted for the whole frame and is released only
//! after the final byte exchange. The bus carries no CRC or parity; a
//! corrupted or misaligned transaction silently yields stale or garbage
//! bytes, so nothing here retries, verifies or rolls back.
//!
//! # Interrupt Acknowledgment
//!
//! Reading the status register clears the device's latched interrupt
//! condition. [`Adxl362::acknowledge_interrupt`] exposes that combined
//! read-and-clear; a plain [`Adxl362::read_register`] of the same address
//! has the identical side effect, so the status register is excluded from
//! any write/read round-trip expectations.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::config::SensorConfig;

/// Register write opcode.
const CMD_WRITE: u8 = 0x0A;
/// Register read opcode.
const CMD_READ: u8 = 0x0B;

/// Register map (the subset this node uses).
pub mod reg {
    /// Analog Devices vendor id, reads 0xAD.
    pub const DEVID_AD: u8 = 0x00;
    /// MEMS vendor id, reads 0x1D.
    pub const DEVID_MST: u8 = 0x01;
    /// Part id, reads 0xF2.
    pub const PARTID: u8 = 0x02;
    /// Status register; reading it clears the latched interrupt condition.
    pub const STATUS: u8 = 0x0B;
    /// Soft reset register; write [`super::SOFT_RESET_KEY`] to reset.
    pub const SOFT_RESET: u8 = 0x1F;
    /// Activity threshold, low byte.
    pub const THRESH_ACT_L: u8 = 0x20;
    /// Activity threshold, high byte (bits 10:8).
    pub const THRESH_ACT_H: u8 = 0x21;
    /// Activity/inactivity control.
    pub const ACT_INACT_CTL: u8 = 0x27;
    /// INT1 function map.
    pub const INTMAP1: u8 = 0x2A;
    /// Range, half bandwidth and output data rate.
    pub const FILTER_CTL: u8 = 0x2C;
    /// Power control; measurement enable lives here.
    pub const POWER_CTL: u8 = 0x2D;
}

/// Key written to `SOFT_RESET` to reset the device ('R').
const SOFT_RESET_KEY: u8 = 0x52;
/// Settle time after soft reset; the device ignores register access until
/// it has elapsed (datasheet maximum is 0.5 ms).
const RESET_SETTLE_MS: u32 = 1;
/// Expected `PARTID` contents.
const PART_ID: u8 = 0xF2;

/// `POWER_CTL` measurement-mode field set to measurement.
const MEASURE_ON: u8 = 0b10;
/// `ACT_INACT_CTL`: activity detection enabled, referenced mode.
const ACT_REFERENCED: u8 = 0b0000_0011;
/// `INTMAP1`: route the activity condition to the INT1 pin.
const INT1_MAP_ACT: u8 = 0x10;

/// Sensor bus driver error.
#[derive(Debug, PartialEq, Eq)]
pub enum Error<SpiE> {
    /// SPI bus transfer failed.
    Spi(SpiE),
    /// Chip-select pin could not be driven.
    ChipSelect,
    /// Configuration attempted while measurement is enabled; the device
    /// only accepts activity thresholds in standby.
    NotInStandby,
    /// Part id readback after reset did not match the ADXL362.
    UnknownDevice,
}

/// Decoded status register.
///
/// Produced by [`Adxl362::acknowledge_interrupt`]; by the time the caller
/// sees it, the device-side latch is already cleared.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    /// New sample ready.
    pub data_ready: bool,
    /// At least one FIFO sample available.
    pub fifo_ready: bool,
    /// FIFO watermark reached.
    pub fifo_watermark: bool,
    /// FIFO overrun.
    pub fifo_overrun: bool,
    /// Activity condition latched.
    pub activity: bool,
    /// Inactivity condition latched.
    pub inactivity: bool,
    /// Device is awake (activity state machine).
    pub awake: bool,
    /// SEU error detected in user registers.
    pub err_user_regs: bool,
}

impl Status {
    fn from_bits(bits: u8) -> Self {
        Self {
            data_ready: bits & 0x01 != 0,
            fifo_ready: bits & 0x02 != 0,
            fifo_watermark: bits & 0x04 != 0,
            fifo_overrun: bits & 0x08 != 0,
            activity: bits & 0x10 != 0,
            inactivity: bits & 0x20 != 0,
            awake: bits & 0x40 != 0,
            err_user_regs: bits & 0x80 != 0,
        }
    }
}

/// ADXL362 driver over an SPI bus, a chip-select output and a delay.
///
/// The driver tracks whether measurement is enabled so it can refuse
/// configuration writes the device would silently ignore.
pub struct Adxl362<SPI, CS, D> {
    spi: SPI,
    cs: CS,
    delay: D,
    measuring: bool,
}

impl<SPI, CS, D> Adxl362<SPI, CS, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    D: DelayNs,
{
    /// Creates the driver. The chip-select pin must start deasserted (high).
    pub fn new(spi: SPI, cs: CS, delay: D) -> Self {
        Self {
            spi,
            cs,
            delay,
            measuring: false,
        }
    }

    /// Runs one chip-select framed full-duplex exchange.
    ///
    /// Chip select is released even when the transfer fails, but only
    /// after the bus has drained.
    fn transaction(&mut self, frame: &mut [u8]) -> Result<(), Error<SPI::Error>> {
        self.cs.set_low().map_err(|_| Error::ChipSelect)?;
        let transferred = self.spi.transfer_in_place(frame).map_err(Error::Spi);
        let flushed = self.spi.flush().map_err(Error::Spi);
        self.cs.set_high().map_err(|_| Error::ChipSelect)?;
        transferred?;
        flushed
    }

    /// Reads one register.
    pub fn read_register(&mut self, address: u8) -> Result<u8, Error<SPI::Error>> {
        let mut frame = [CMD_READ, address, 0x00];
        self.transaction(&mut frame)?;
        Ok(frame[2])
    }

    /// Writes one register.
    pub fn write_register(&mut self, address: u8, value: u8) -> Result<(), Error<SPI::Error>> {
        let mut frame = [CMD_WRITE, address, value];
        self.transaction(&mut frame)
    }

    /// Soft-resets the device and waits out the settle time.
    ///
    /// Register access before the settle delay elapses is a protocol
    /// violation the device answers by ignoring the write, so the delay is
    /// taken unconditionally. The part id is verified afterwards; a board
    /// with a missing or unpowered sensor fails here instead of measuring
    /// garbage forever.
    pub fn reset(&mut self) -> Result<(), Error<SPI::Error>> {
        self.write_register(reg::SOFT_RESET, SOFT_RESET_KEY)?;
        self.delay.delay_ms(RESET_SETTLE_MS);
        if self.read_register(reg::PARTID)? != PART_ID {
            return Err(Error::UnknownDevice);
        }
        self.measuring = false;
        Ok(())
    }

    /// Writes the full measurement configuration.
    ///
    /// The activity threshold registers are only accepted in standby, so
    /// this refuses to run while measurement is enabled. Thresholds and
    /// interrupt routing go in before `FILTER_CTL`.
    pub fn configure(&mut self, config: &SensorConfig) -> Result<(), Error<SPI::Error>> {
        if self.measuring {
            return Err(Error::NotInStandby);
        }
        let code = config.activity_threshold_code();
        self.write_register(reg::THRESH_ACT_L, code as u8)?;
        self.write_register(reg::THRESH_ACT_H, (code >> 8) as u8)?;
        self.write_register(reg::ACT_INACT_CTL, ACT_REFERENCED)?;
        self.write_register(reg::INTMAP1, INT1_MAP_ACT)?;
        self.write_register(reg::FILTER_CTL, config.filter_ctl())
    }

    /// Enables or disables measurement.
    ///
    /// Enabling is the last step of boot; the device starts producing
    /// activity interrupts once this returns.
    pub fn enable_measurement(&mut self, on: bool) -> Result<(), Error<SPI::Error>> {
        self.write_register(reg::POWER_CTL, if on { MEASURE_ON } else { 0x00 })?;
        self.measuring = on;
        Ok(())
    }

    /// Reads the status register, clearing the device's latched interrupt
    /// condition as a side effect of the read.
    pub fn acknowledge_interrupt(&mut self) -> Result<Status, Error<SPI::Error>> {
        Ok(Status::from_bits(self.read_register(reg::STATUS)?))
    }
}

impl<SPI, CS, D> crate::power::MotionSensor for Adxl362<SPI, CS, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    D: DelayNs,
{
    type Error = Error<SPI::Error>;

    fn acknowledge_interrupt(&mut self) -> Result<Status, Self::Error> {
        Adxl362::acknowledge_interrupt(self)
    }
}

/// Register-file simulation of the sensor for tests, shared with the boot
/// sequence tests in [`crate::power`].
#[cfg(test)]
pub(crate) mod sim {
    use core::cell::{Cell, RefCell};
    use core::convert::Infallible;

    use embedded_hal::delay::DelayNs;
    use embedded_hal::digital::OutputPin;
    use embedded_hal::spi::{ErrorType, SpiBus};

    use super::{Adxl362, CMD_READ, CMD_WRITE, SOFT_RESET_KEY, reg};

    const REG_COUNT: usize = 0x30;

    /// The simulated register file, with the device's side effects:
    /// reading STATUS clears it, writing the reset key restores defaults.
    pub struct Registers {
        mem: [u8; REG_COUNT],
        part_id: u8,
    }

    impl Registers {
        pub fn reset() -> Self {
            Self::with_part_id(0xF2)
        }

        /// A device that answers with a different part id, standing in for
        /// a missing or unpowered sensor.
        pub fn with_part_id(part_id: u8) -> Self {
            let mut mem = [0u8; REG_COUNT];
            mem[reg::DEVID_AD as usize] = 0xAD;
            mem[reg::DEVID_MST as usize] = 0x1D;
            mem[reg::PARTID as usize] = part_id;
            mem[reg::FILTER_CTL as usize] = 0x13;
            Self { mem, part_id }
        }

        pub fn force(&mut self, address: u8, value: u8) {
            self.mem[address as usize] = value;
        }

        pub fn peek(&self, address: u8) -> u8 {
            self.mem[address as usize]
        }

        fn read(&mut self, address: u8) -> u8 {
            let value = self.mem[address as usize];
            if address == reg::STATUS {
                self.mem[address as usize] = 0;
            }
            value
        }

        fn write(&mut self, address: u8, value: u8) {
            if address == reg::SOFT_RESET && value == SOFT_RESET_KEY {
                *self = Registers::with_part_id(self.part_id);
            } else {
                self.mem[address as usize] = value;
            }
        }
    }

    /// SPI bus end of the simulation. Panics if clocked while chip select
    /// is deasserted; the real device would return garbage there.
    pub struct SimBus<'a> {
        cs: &'a Cell<bool>,
        regs: &'a RefCell<Registers>,
    }

    impl SimBus<'_> {
        fn exchange(&mut self, frame: &mut [u8]) {
            assert!(
                !self.cs.get(),
                "bus clocked without chip select asserted"
            );
            let mut regs = self.regs.borrow_mut();
            let opcode = frame[0];
            let base = frame[1];
            match opcode {
                CMD_WRITE => {
                    for i in 2..frame.len() {
                        regs.write(base + (i - 2) as u8, frame[i]);
                    }
                }
                CMD_READ => {
                    for i in 2..frame.len() {
                        frame[i] = regs.read(base + (i - 2) as u8);
                    }
                }
                _ => {}
            }
        }
    }

    impl ErrorType for SimBus<'_> {
        type Error = Infallible;
    }

    impl SpiBus<u8> for SimBus<'_> {
        fn read(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
            words.fill(0);
            Ok(())
        }

        fn write(&mut self, words: &[u8]) -> Result<(), Infallible> {
            let mut scratch = [0u8; 8];
            scratch[..words.len()].copy_from_slice(words);
            self.exchange(&mut scratch[..words.len()]);
            Ok(())
        }

        fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Infallible> {
            let mut scratch = [0u8; 8];
            scratch[..write.len()].copy_from_slice(write);
            self.exchange(&mut scratch[..write.len()]);
            let n = read.len().min(write.len());
            read[..n].copy_from_slice(&scratch[..n]);
            Ok(())
        }

        fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
            self.exchange(words);
            Ok(())
        }

        fn flush(&mut self) -> Result<(), Infallible> {
            Ok(())
        }
    }

    /// Chip-select end of the simulation; `true` in the cell means
    /// deasserted (the line idles high).
    pub struct SimCs<'a>(&'a Cell<bool>);

    impl embedded_hal::digital::ErrorType for SimCs<'_> {
        type Error = Infallible;
    }

    impl OutputPin for SimCs<'_> {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.set(true);
            Ok(())
        }
    }

    pub struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    /// Builds a driver over the simulated bus.
    pub fn sensor<'a>(
        cs: &'a Cell<bool>,
        regs: &'a RefCell<Registers>,
    ) -> Adxl362<SimBus<'a>, SimCs<'a>, NoDelay> {
        Adxl362::new(SimBus { cs, regs }, SimCs(cs), NoDelay)
    }
}
