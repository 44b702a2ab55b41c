//! Wake-source configuration for the external interrupt lines.
//!
//! Three lines can wake the node: two active-low push buttons and the
//! accelerometer's INT1 output. The chip-specific GPIO and interrupt
//! controller sit behind [`WakePort`]; the core only states which edge and
//! filtering each line needs.

use crate::event::Button;

/// Interrupt trigger edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// Low-to-high transition.
    Rising,
    /// High-to-low transition.
    Falling,
}

/// External lines able to wake the node from deep sleep.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeLine {
    /// A push button, active low.
    Button(Button),
    /// The accelerometer's INT1 output, active high.
    MotionInt,
}

/// GPIO and interrupt-controller capabilities the core needs for wake
/// configuration. One implementation per chip family.
pub trait WakePort {
    /// Configures `line` as an input, engaging the input glitch filter
    /// when `filtered` and the hardware has one.
    fn configure_input(&mut self, line: WakeLine, filtered: bool);

    /// Arms edge detection on a configured line.
    fn arm_edge(&mut self, line: WakeLine, edge: Edge);

    /// Unmasks the wake interrupts at the interrupt controller.
    ///
    /// Any armed line may invoke its handler as soon as this returns, even
    /// before the rest of boot completes. Handlers must therefore touch
    /// nothing but the event flag.
    fn enable_interrupts(&mut self);
}

/// Arms all three wake lines.
///
/// Buttons are active low, so they trigger on the falling edge with the
/// glitch filter engaged. The accelerometer interrupt is a fast rising
/// edge and must not be filtered. Inputs are configured and the controller
/// unmasked before any edge is armed.
pub fn arm_wake_sources<P: WakePort>(port: &mut P) {
    port.configure_input(WakeLine::Button(Button::A), true);
    port.configure_input(WakeLine::Button(Button::B), true);
    port.configure_input(WakeLine::MotionInt, false);

    port.enable_interrupts();

    port.arm_edge(WakeLine::Button(Button::A), Edge::Falling);
    port.arm_edge(WakeLine::Button(Button::B), Edge::Falling);
    port.arm_edge(WakeLine::MotionInt, Edge::Rising);
}

#[cfg(test)]
mod tests {
    use heapless::Vec;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum Op {
        Configure(WakeLine, bool),
        Arm(WakeLine, Edge),
        Enable,
    }

    #[derive(Default)]
    struct RecordingPort {
        ops: Vec<Op, 8>,
    }

    impl WakePort for RecordingPort {
        fn configure_input(&mut self, line: WakeLine, filtered: bool) {
            self.ops.push(Op::Configure(line, filtered)).unwrap();
        }

        fn arm_edge(&mut self, line: WakeLine, edge: Edge) {
            self.ops.push(Op::Arm(line, edge)).unwrap();
        }

        fn enable_interrupts(&mut self) {
            self.ops.push(Op::Enable).unwrap();
        }
    }

    #[test]
    fn buttons_filtered_falling_motion_unfiltered_rising() {
        let mut port = RecordingPort::default();
        arm_wake_sources(&mut port);
        assert_eq!(
            &port.ops[..],
            &[
                Op::Configure(WakeLine::Button(Button::A), true),
                Op::Configure(WakeLine::Button(Button::B), true),
                Op::Configure(WakeLine::MotionInt, false),
                Op::Enable,
                Op::Arm(WakeLine::Button(Button::A), Edge::Falling),
                Op::Arm(WakeLine::Button(Button::B), Edge::Falling),
                Op::Arm(WakeLine::MotionInt, Edge::Rising),
            ][..]
        );
    }
}
