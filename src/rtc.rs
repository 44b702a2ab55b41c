//! Periodic wake-up timer driven from the low-frequency crystal.
//!
//! The timer bounds the maximum sleep duration: it fires unconditionally
//! every interval, and the state machine treats its interrupt exactly like
//! a button or motion wake. It is a ceiling, not a precise schedule, and
//! it stays armed across sleep transitions.

/// Low-frequency crystal frequency in Hz (32.768 kHz watch crystal).
pub const LFXO_HZ: u32 = 32_768;

/// The wake timer's clock source or ready flag never came up.
///
/// Boot treats this as fatal: without a bounded sleep duration nothing
/// later in the system is safe to run. The caller decides whether to
/// halt, reset or report.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerFault;

/// Compare-channel timer capability. One implementation per chip family.
pub trait CompareTimer {
    /// Arms the compare channel to fire an interrupt every `compare_ticks`
    /// of the timer clock.
    fn arm(&mut self, compare_ticks: u32) -> Result<(), TimerFault>;
}

/// Derives the compare value for a wake interval.
///
/// Never returns zero: depending on the counter hardware a zero compare
/// either never matches or matches continuously, and both break the
/// one-interrupt-per-interval contract. Overlong intervals saturate.
pub const fn compare_ticks(interval_secs: u32, clock_hz: u32) -> u32 {
    let ticks = interval_secs.saturating_mul(clock_hz);
    if ticks == 0 { 1 } else { ticks }
}

/// Arms `timer` to fire every `interval_secs`, given its clock frequency.
pub fn arm_periodic<T: CompareTimer>(
    timer: &mut T,
    interval_secs: u32,
    clock_hz: u32,
) -> Result<(), TimerFault> {
    timer.arm(compare_ticks(interval_secs, clock_hz))
}

/// Counter model of a compare timer for tests, shared with the boot
/// sequence tests in [`crate::power`].
#[cfg(test)]
pub(crate) mod sim {
    use super::{CompareTimer, TimerFault};

    /// Free-running counter that fires on compare match and wraps to zero,
    /// like the hardware compare channel it stands in for.
    #[derive(Default)]
    pub struct SimTimer {
        pub compare: Option<u32>,
        counter: u32,
        pub fires: u32,
    }

    impl SimTimer {
        pub fn tick(&mut self) {
            let compare = self.compare.expect("timer not armed");
            self.counter += 1;
            if self.counter == compare {
                self.fires += 1;
                self.counter = 0;
            }
        }
    }

    impl CompareTimer for SimTimer {
        fn arm(&mut self, compare_ticks: u32) -> Result<(), TimerFault> {
            self.compare = Some(compare_ticks);
            self.counter = 0;
            Ok(())
        }
    }

    /// A timer whose clock never starts.
    pub struct DeadTimer;

    impl CompareTimer for DeadTimer {
        fn arm(&mut self, _compare_ticks: u32) -> Result<(), TimerFault> {
            Err(TimerFault)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::sim::SimTimer;
    use super::*;

    #[test]
    fn compare_value_is_interval_times_clock() {
        assert_eq!(compare_ticks(60, LFXO_HZ), 1_966_080);
        assert_eq!(compare_ticks(1, LFXO_HZ), 32_768);
        assert_eq!(compare_ticks(1, 1), 1);
    }

    #[test]
    fn compare_value_never_zero_and_saturates() {
        assert_eq!(compare_ticks(0, LFXO_HZ), 1);
        assert_eq!(compare_ticks(u32::MAX, LFXO_HZ), u32::MAX);
    }

    #[test]
    fn minimum_compare_fires_once_per_tick() {
        let mut timer = SimTimer::default();
        arm_periodic(&mut timer, 1, 1).unwrap();
        assert_eq!(timer.compare, Some(1));
        for expected in 1..=3 {
            timer.tick();
            assert_eq!(timer.fires, expected, "one fire per interval, no double-fire");
        }
    }

    #[test]
    fn longer_compare_fires_once_per_interval() {
        let mut timer = SimTimer::default();
        arm_periodic(&mut timer, 4, 1).unwrap();
        for _ in 0..8 {
            timer.tick();
        }
        assert_eq!(timer.fires, 2);
    }
}
