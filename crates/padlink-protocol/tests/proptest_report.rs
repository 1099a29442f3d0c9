//! Property tests for the report codec: button round-trips, d-pad isolation,
//! touch coordinate packing and float scaling.

use padlink_protocol::axis;
use padlink_protocol::report::{TOUCH_COORD_MAX, pack_touch_coords, unpack_touch_coords};
use padlink_protocol::{Ds4Buttons, Ds4Dpad, Ds4Report, X360Report, XusbButtons};
use proptest::prelude::*;

fn any_dpad() -> impl Strategy<Value = Ds4Dpad> {
    (0u8..=8).prop_map(Ds4Dpad::from_nibble)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Pressing then releasing a button that was up restores the mask exactly.
    #[test]
    fn prop_x360_press_release_restores_mask(prior in any::<u16>(), bit in 0u32..16) {
        let button = XusbButtons::from_bits_retain(1 << bit);
        let mut r = X360Report { buttons: prior & !button.bits(), ..X360Report::NEUTRAL };
        let before = r.buttons;
        r.press(button);
        prop_assert!(r.is_pressed(button));
        r.release(button);
        prop_assert_eq!(r.buttons, before);
    }

    #[test]
    fn prop_ds4_press_release_restores_mask(prior in any::<u16>(), bit in 4u32..16) {
        let button = Ds4Buttons::from_bits_retain(1 << bit);
        let mut r = Ds4Report { buttons: prior & !button.bits(), ..Ds4Report::NEUTRAL };
        let before = r.buttons;
        r.press(button);
        r.release(button);
        prop_assert_eq!(r.buttons, before);
    }

    /// The hat only ever writes the low nibble.
    #[test]
    fn prop_dpad_preserves_upper_twelve_bits(prior in any::<u16>(), dpad in any_dpad()) {
        let mut r = Ds4Report { buttons: prior, ..Ds4Report::NEUTRAL };
        r.set_dpad(dpad);
        prop_assert_eq!(r.buttons & 0xFFF0, prior & 0xFFF0);
        prop_assert_eq!(r.dpad(), dpad);
    }

    #[test]
    fn prop_touch_coords_roundtrip(x in 0u16..=TOUCH_COORD_MAX, y in 0u16..=TOUCH_COORD_MAX) {
        prop_assert_eq!(unpack_touch_coords(pack_touch_coords(x, y)), (x, y));
    }

    #[test]
    fn prop_x360_axis_matches_rounded_scale(f in -1.0f64..=1.0) {
        let expected = (f * 32767.0).round_ties_even() as i16;
        prop_assert_eq!(axis::x360_axis(f), expected);
    }

    #[test]
    fn prop_ds4_axis_matches_offset_scale(f in -1.0f64..=1.0) {
        let expected = 128 + (f * 127.0).round_ties_even() as i32;
        prop_assert_eq!(i32::from(axis::ds4_axis(f)), expected);
        prop_assert!((1..=255).contains(&expected));
    }

    #[test]
    fn prop_out_of_range_floats_clamp(f in prop::num::f64::NORMAL) {
        let x = axis::x360_axis(f);
        prop_assert!((-32767..=32767).contains(&x));
        prop_assert!(axis::ds4_axis(f) >= 1);
        let t = axis::trigger(f);
        prop_assert!(f > 0.0 || t == 0);
        prop_assert!(f < 1.0 || t == 255);
    }
}
