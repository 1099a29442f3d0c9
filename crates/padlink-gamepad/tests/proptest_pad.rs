//! Property tests over the pad mutation API, driven through the mock bus.

use padlink_bus::Bus;
use padlink_bus::backend::mock::Mock;
use padlink_gamepad::{Ds4Pad, Gamepad, StandardButton, X360Pad};
use padlink_protocol::{Ds4Report, X360Report};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Button(usize, bool),
    LeftStick(f64, f64),
    RightStick(f64, f64),
    LeftTrigger(f64),
    RightTrigger(f64),
}

fn any_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..17, any::<bool>()).prop_map(|(i, p)| Op::Button(i, p)),
        (-1.0f64..=1.0, -1.0f64..=1.0).prop_map(|(x, y)| Op::LeftStick(x, y)),
        (-1.0f64..=1.0, -1.0f64..=1.0).prop_map(|(x, y)| Op::RightStick(x, y)),
        (0.0f64..=1.0).prop_map(Op::LeftTrigger),
        (0.0f64..=1.0).prop_map(Op::RightTrigger),
    ]
}

fn apply(pad: &mut dyn Gamepad, op: &Op) {
    match *op {
        Op::Button(i, pressed) => {
            if let Some(b) = StandardButton::from_index(i) {
                pad.set_button(b, pressed);
            }
        }
        Op::LeftStick(x, y) => pad.left_joystick_float(x, y),
        Op::RightStick(x, y) => pad.right_joystick_float(x, y),
        Op::LeftTrigger(v) => pad.left_trigger_float(v),
        Op::RightTrigger(v) => pad.right_trigger_float(v),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever was set, reset lands on the neutral report, and stays there.
    #[test]
    fn prop_reset_is_a_fixpoint(ops in prop::collection::vec(any_op(), 0..24)) {
        let bus = Bus::open(Mock::new()).unwrap();
        let mut x360 = X360Pad::new(bus.clone()).unwrap();
        let mut ds4 = Ds4Pad::new(bus).unwrap();
        for op in &ops {
            apply(&mut x360, op);
            apply(&mut ds4, op);
        }
        x360.reset();
        ds4.reset();
        prop_assert_eq!(x360.report(), &X360Report::NEUTRAL);
        prop_assert_eq!(ds4.report(), &Ds4Report::NEUTRAL);
        x360.reset();
        ds4.reset();
        prop_assert_eq!(x360.report(), &X360Report::NEUTRAL);
        prop_assert_eq!(ds4.report(), &Ds4Report::NEUTRAL);
    }

    #[test]
    fn prop_x360_stick_scales_and_inverts_y(x in -1.0f64..=1.0, y in -1.0f64..=1.0) {
        let bus = Bus::open(Mock::new()).unwrap();
        let mut pad = X360Pad::new(bus).unwrap();
        pad.right_joystick_float(x, y);
        prop_assert_eq!(pad.report().thumb_rx, (x * 32767.0).round_ties_even() as i16);
        prop_assert_eq!(pad.report().thumb_ry, -((y * 32767.0).round_ties_even() as i16));
    }

    #[test]
    fn prop_ds4_stick_scales_around_centre(x in -1.0f64..=1.0, y in -1.0f64..=1.0) {
        let bus = Bus::open(Mock::new()).unwrap();
        let mut pad = Ds4Pad::new(bus).unwrap();
        pad.left_joystick_float(x, y);
        let expected_x = (128 + (x * 127.0).round_ties_even() as i32) as u8;
        let expected_y = (128 + (y * 127.0).round_ties_even() as i32) as u8;
        prop_assert_eq!(pad.report().thumb_lx, expected_x);
        prop_assert_eq!(pad.report().thumb_ly, expected_y.wrapping_neg());
    }
}
