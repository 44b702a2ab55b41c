//! Accelerometer configuration parameters and their register encodings.
//!
//! Pure mapping from physical parameters (measurement range in g, output
//! data rate in Hz, activity threshold in milli-g) to ADXL362 bitfields.
//! Kept free of bus access so every encoding is testable without hardware.

/// Measurement range, encoded into `FILTER_CTL[7:6]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Range {
    /// ±2 g
    G2,
    /// ±4 g
    G4,
    /// ±8 g
    G8,
}

impl Range {
    /// Range field, already shifted into bits 7:6.
    pub const fn bits(self) -> u8 {
        match self {
            Range::G2 => 0b00 << 6,
            Range::G4 => 0b01 << 6,
            Range::G8 => 0b10 << 6,
        }
    }

    /// Activity threshold resolution at this range, in milli-g per code.
    pub const fn mg_per_code(self) -> u16 {
        match self {
            Range::G2 => 1,
            Range::G4 => 2,
            Range::G8 => 4,
        }
    }
}

/// Output data rate, encoded into `FILTER_CTL[2:0]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputDataRate {
    /// 12.5 Hz
    Hz12_5,
    /// 25 Hz
    Hz25,
    /// 50 Hz
    Hz50,
    /// 100 Hz (device reset default)
    Hz100,
    /// 200 Hz
    Hz200,
    /// 400 Hz
    Hz400,
}

impl OutputDataRate {
    /// ODR field in bits 2:0.
    pub const fn bits(self) -> u8 {
        match self {
            OutputDataRate::Hz12_5 => 0b000,
            OutputDataRate::Hz25 => 0b001,
            OutputDataRate::Hz50 => 0b010,
            OutputDataRate::Hz100 => 0b011,
            OutputDataRate::Hz200 => 0b100,
            OutputDataRate::Hz400 => 0b101,
        }
    }
}

/// `FILTER_CTL` half-bandwidth bit, kept at the device reset default
/// (antialias bandwidth of ODR/4).
const HALF_BW: u8 = 0x10;

/// Activity threshold registers hold an 11-bit code.
const THRESHOLD_CODE_MAX: u16 = 0x07FF;

/// Immutable sensor configuration, built once at boot and written to the
/// device through the bus driver before measurement is enabled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorConfig {
    /// Measurement range.
    pub range: Range,
    /// Output data rate.
    pub odr: OutputDataRate,
    /// Activity threshold in milli-g; motion above this magnitude latches
    /// the sensor's activity interrupt.
    pub activity_threshold_mg: u16,
}

impl SensorConfig {
    /// Complete `FILTER_CTL` register value for this configuration.
    pub const fn filter_ctl(&self) -> u8 {
        self.range.bits() | HALF_BW | self.odr.bits()
    }

    /// Activity threshold device code, scaled by the range's resolution
    /// and clamped to the register's 11 bits.
    pub const fn activity_threshold_code(&self) -> u16 {
        let code = self.activity_threshold_mg / self.range.mg_per_code();
        if code > THRESHOLD_CODE_MAX {
            THRESHOLD_CODE_MAX
        } else {
            code
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_field_encoding() {
        assert_eq!(Range::G2.bits(), 0x00);
        assert_eq!(Range::G4.bits(), 0x40);
        assert_eq!(Range::G8.bits(), 0x80);
    }

    #[test]
    fn odr_field_encoding() {
        assert_eq!(OutputDataRate::Hz12_5.bits(), 0b000);
        assert_eq!(OutputDataRate::Hz25.bits(), 0b001);
        assert_eq!(OutputDataRate::Hz50.bits(), 0b010);
        assert_eq!(OutputDataRate::Hz100.bits(), 0b011);
        assert_eq!(OutputDataRate::Hz200.bits(), 0b100);
        assert_eq!(OutputDataRate::Hz400.bits(), 0b101);
    }

    #[test]
    fn threshold_scales_with_range_resolution() {
        // 3 g expressed at each range.
        let mg = 3000;
        let at = |range| SensorConfig {
            range,
            odr: OutputDataRate::Hz12_5,
            activity_threshold_mg: mg,
        };
        assert_eq!(at(Range::G2).activity_threshold_code(), 2047); // clamped to 11 bits
        assert_eq!(at(Range::G4).activity_threshold_code(), 1500);
        assert_eq!(at(Range::G8).activity_threshold_code(), 750);
    }

    #[test]
    fn filter_ctl_combines_range_half_bandwidth_and_odr() {
        let config = SensorConfig {
            range: Range::G4,
            odr: OutputDataRate::Hz12_5,
            activity_threshold_mg: 3000,
        };
        assert_eq!(config.filter_ctl(), 0x50);

        // Device reset default: ±2 g, half bandwidth, 100 Hz.
        let default = SensorConfig {
            range: Range::G2,
            odr: OutputDataRate::Hz100,
            activity_threshold_mg: 0,
        };
        assert_eq!(default.filter_ctl(), 0x13);
    }
}
