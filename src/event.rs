//! Wake event flag shared between interrupt handlers and the foreground loop.
//!
//! The flag is the only data that crosses the interrupt/foreground boundary.
//! Interrupt handlers raise it with a single atomic store and return; the
//! power state machine reads and clears it from the foreground loop. No lock
//! exists anywhere on this path, so nothing can be held across an interrupt.

use portable_atomic::{AtomicBool, Ordering};

/// Manual wake buttons present on the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// First push button (active low).
    A,
    /// Second push button (active low).
    B,
}

/// A single hardware wake-up cause.
///
/// Produced only inside interrupt context and never stored or queued:
/// raising one collapses into setting the shared [`EventFlag`], because the
/// foreground loop only needs to know that *something* happened, not what
/// or how many times.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeEvent {
    /// One of the push buttons was pressed.
    ButtonPressed(Button),
    /// The accelerometer latched its activity interrupt.
    MotionDetected,
    /// The periodic wake-up timer expired.
    TimerExpired,
}

/// One shared boolean crossing the interrupt/foreground boundary.
///
/// Set only from interrupt handlers via [`EventFlag::raise`], cleared only
/// by the power state machine once the sensor's latched condition has been
/// acknowledged. A raise racing the clear merges the event into the next
/// wake cycle; events are liveness signals, not a counted queue.
pub struct EventFlag(AtomicBool);

impl EventFlag {
    /// Creates a lowered flag. `const` so it can back a `static`.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Records that a wake event occurred.
    ///
    /// Safe to call from interrupt context at any time after the line is
    /// armed, including before the rest of boot completes: it touches
    /// nothing but the flag. The event value itself is discarded; the
    /// state machine treats all wake sources uniformly.
    pub fn raise(&self, _event: WakeEvent) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns whether an event is pending without consuming it.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Lowers the flag. Called once per serviced event.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Atomically consumes the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

impl Default for EventFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_source_raises_the_flag_exactly_once() {
        let sources = [
            WakeEvent::ButtonPressed(Button::A),
            WakeEvent::ButtonPressed(Button::B),
            WakeEvent::MotionDetected,
            WakeEvent::TimerExpired,
        ];
        for event in sources {
            let flag = EventFlag::new();
            assert!(!flag.is_set());
            flag.raise(event);
            assert!(flag.take(), "one edge must set the flag");
            assert!(!flag.take(), "one edge must not set the flag twice");
        }
    }

    #[test]
    fn repeated_raises_merge_into_one_observation() {
        let flag = EventFlag::new();
        flag.raise(WakeEvent::MotionDetected);
        flag.raise(WakeEvent::TimerExpired);
        assert!(flag.is_set());
        flag.clear();
        assert!(!flag.is_set());
    }
}
