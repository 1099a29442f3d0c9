//! Normalized float to wire-range conversions.
//!
//! Rounding is half-to-even so that callers ported from the reference client
//! produce identical reports. Inputs are clamped to their normalized domain
//! first; NaN lands on the centre (sticks) or zero (triggers).

/// Scale of a 360 stick axis: `1.0` maps to `32767`.
pub const X360_AXIS_SCALE: f64 = 32767.0;
/// Half-range of a DualShock stick axis around [`DS4_AXIS_CENTER`].
pub const DS4_AXIS_SCALE: f64 = 127.0;
pub const DS4_AXIS_CENTER: u8 = 0x80;
pub const TRIGGER_SCALE: f64 = 255.0;

/// `[-1.0, 1.0]` to a signed 360 stick value in `-32767..=32767`.
#[inline]
pub fn x360_axis(value: f64) -> i16 {
    (value.clamp(-1.0, 1.0) * X360_AXIS_SCALE).round_ties_even() as i16
}

/// `[-1.0, 1.0]` to an unsigned DualShock stick value in `1..=255`, centred on 128.
#[inline]
pub fn ds4_axis(value: f64) -> u8 {
    let delta = (value.clamp(-1.0, 1.0) * DS4_AXIS_SCALE).round_ties_even() as i16;
    (i16::from(DS4_AXIS_CENTER) + delta) as u8
}

/// `[0.0, 1.0]` to a trigger value in `0..=255`.
#[inline]
pub fn trigger(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * TRIGGER_SCALE).round_ties_even() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x360_extremes_and_centre() {
        assert_eq!(x360_axis(1.0), 32767);
        assert_eq!(x360_axis(-1.0), -32767);
        assert_eq!(x360_axis(0.0), 0);
        assert_eq!(x360_axis(4.0), 32767);
        assert_eq!(x360_axis(f64::NAN), 0);
    }

    #[test]
    fn ds4_extremes_stay_inside_byte() {
        assert_eq!(ds4_axis(1.0), 255);
        assert_eq!(ds4_axis(-1.0), 1);
        assert_eq!(ds4_axis(0.0), 128);
        assert_eq!(ds4_axis(-7.5), 1);
        assert_eq!(ds4_axis(f64::NAN), 128);
    }

    #[test]
    fn trigger_rounds_half_to_even() {
        // 0.5 * 255 = 127.5
        assert_eq!(trigger(0.5), 128);
        assert_eq!(trigger(1.0), 255);
        assert_eq!(trigger(-0.2), 0);
        // 0.5 * 127 = 63.5
        assert_eq!(ds4_axis(0.5), 128 + 64);
        assert_eq!(ds4_axis(-0.5), 128 - 64);
    }
}
