use crate::Gamepad;
use crate::layout::StandardButton;
use crate::target::{TargetOptions, VirtualTarget};
use padlink_bus::{Bus, Result};
use padlink_protocol::{
    Ds4Buttons, Ds4Dpad, Ds4Report, Ds4ReportEx, Ds4SpecialButtons, TargetType, axis,
};
use std::sync::Arc;
use tracing::trace;

/// Wired DualShock 4 (v1) controller.
///
/// Y axes follow the same "up is positive" convention as [`X360Pad`](crate::X360Pad),
/// so every Y value is negated before it lands in the report.
#[derive(Debug)]
pub struct Ds4Pad {
    target: VirtualTarget,
    report: Ds4Report,
    held: Directions,
}

/// D-pad directions held through [`Gamepad::set_button`]. The report nibble
/// cannot hold opposing directions, so they are tracked here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Directions {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
}

impl Directions {
    fn of(dpad: Ds4Dpad) -> Self {
        let (up, down, left, right) = dpad.directions();
        Self { up, down, left, right }
    }

    fn dpad(self) -> Ds4Dpad {
        Ds4Dpad::from_directions(self.up, self.down, self.left, self.right)
    }
}

impl Ds4Pad {
    pub fn new(bus: Arc<Bus>) -> Result<Self> {
        Self::with_options(bus, &TargetOptions::default())
    }

    pub fn with_options(bus: Arc<Bus>, options: &TargetOptions) -> Result<Self> {
        let target = VirtualTarget::attach(bus, TargetType::DualShock4Wired, options)?;
        let pad = Self { target, report: Ds4Report::NEUTRAL, held: Directions::default() };
        pad.update()?;
        Ok(pad)
    }

    pub fn report(&self) -> &Ds4Report {
        &self.report
    }

    pub fn press_button(&mut self, button: Ds4Buttons) {
        self.report.press(button);
    }

    pub fn release_button(&mut self, button: Ds4Buttons) {
        self.report.release(button);
    }

    pub fn press_special_button(&mut self, button: Ds4SpecialButtons) {
        self.report.press_special(button);
    }

    pub fn release_special_button(&mut self, button: Ds4SpecialButtons) {
        self.report.release_special(button);
    }

    pub fn directional_pad(&mut self, direction: Ds4Dpad) {
        self.held = Directions::of(direction);
        self.report.set_dpad(direction);
    }

    pub fn left_trigger(&mut self, value: u8) {
        self.report.trigger_l = value;
    }

    pub fn right_trigger(&mut self, value: u8) {
        self.report.trigger_r = value;
    }

    /// 128 is centre. `y` is stored negated (mod 256).
    pub fn left_joystick(&mut self, x: u8, y: u8) {
        self.report.thumb_lx = x;
        self.report.thumb_ly = y.wrapping_neg();
    }

    pub fn right_joystick(&mut self, x: u8, y: u8) {
        self.report.thumb_rx = x;
        self.report.thumb_ry = y.wrapping_neg();
    }

    pub fn update(&self) -> Result<()> {
        trace!(id = %self.target.id(), report = ?self.report, "ds4 commit");
        self.target.commit_with(|backend, id| backend.ds4_update(id, &self.report))
    }

    /// Send a full report with motion and touch data instead of the basic
    /// one. The pad's own report is left untouched.
    pub fn update_extended_report(&self, report: &Ds4ReportEx) -> Result<()> {
        trace!(id = %self.target.id(), "ds4 extended commit");
        self.target.commit_with(|backend, id| backend.ds4_update_ex(id, report))
    }

    fn set_dpad_direction(&mut self, button: StandardButton, pressed: bool) {
        match button {
            StandardButton::DpadUp => self.held.up = pressed,
            StandardButton::DpadDown => self.held.down = pressed,
            StandardButton::DpadLeft => self.held.left = pressed,
            StandardButton::DpadRight => self.held.right = pressed,
            _ => return,
        }
        self.report.set_dpad(self.held.dpad());
    }
}

fn button_mask(button: StandardButton) -> Ds4Buttons {
    match button {
        StandardButton::A => Ds4Buttons::CROSS,
        StandardButton::B => Ds4Buttons::CIRCLE,
        StandardButton::X => Ds4Buttons::SQUARE,
        StandardButton::Y => Ds4Buttons::TRIANGLE,
        StandardButton::LeftShoulder => Ds4Buttons::SHOULDER_LEFT,
        StandardButton::RightShoulder => Ds4Buttons::SHOULDER_RIGHT,
        StandardButton::LeftTrigger => Ds4Buttons::TRIGGER_LEFT,
        StandardButton::RightTrigger => Ds4Buttons::TRIGGER_RIGHT,
        StandardButton::Back => Ds4Buttons::SHARE,
        StandardButton::Start => Ds4Buttons::OPTIONS,
        StandardButton::LeftThumb => Ds4Buttons::THUMB_LEFT,
        StandardButton::RightThumb => Ds4Buttons::THUMB_RIGHT,
        StandardButton::DpadUp
        | StandardButton::DpadDown
        | StandardButton::DpadLeft
        | StandardButton::DpadRight
        | StandardButton::Guide => Ds4Buttons::empty(),
    }
}

impl Gamepad for Ds4Pad {
    fn kind(&self) -> TargetType {
        TargetType::DualShock4Wired
    }

    fn target(&self) -> &VirtualTarget {
        &self.target
    }

    fn target_mut(&mut self) -> &mut VirtualTarget {
        &mut self.target
    }

    fn reset(&mut self) {
        self.report = Ds4Report::NEUTRAL;
        self.held = Directions::default();
    }

    fn set_button(&mut self, button: StandardButton, pressed: bool) {
        if button.is_dpad() {
            self.set_dpad_direction(button, pressed);
            return;
        }
        if button == StandardButton::Guide {
            if pressed {
                self.press_special_button(Ds4SpecialButtons::PS);
            } else {
                self.release_special_button(Ds4SpecialButtons::PS);
            }
            return;
        }
        let mask = button_mask(button);
        if pressed {
            self.press_button(mask);
        } else {
            self.release_button(mask);
        }
        let full = if pressed { u8::MAX } else { 0 };
        match button {
            StandardButton::LeftTrigger => self.left_trigger(full),
            StandardButton::RightTrigger => self.right_trigger(full),
            _ => {}
        }
    }

    // The digital trigger bit follows the analog value, as with `set_button`.
    fn left_trigger_float(&mut self, value: f64) {
        let value = axis::trigger(value);
        if value > 0 {
            self.press_button(Ds4Buttons::TRIGGER_LEFT);
        } else {
            self.release_button(Ds4Buttons::TRIGGER_LEFT);
        }
        self.left_trigger(value);
    }

    fn right_trigger_float(&mut self, value: f64) {
        let value = axis::trigger(value);
        if value > 0 {
            self.press_button(Ds4Buttons::TRIGGER_RIGHT);
        } else {
            self.release_button(Ds4Buttons::TRIGGER_RIGHT);
        }
        self.right_trigger(value);
    }

    fn left_joystick_float(&mut self, x: f64, y: f64) {
        self.left_joystick(axis::ds4_axis(x), axis::ds4_axis(y));
    }

    fn right_joystick_float(&mut self, x: f64, y: f64) {
        self.right_joystick(axis::ds4_axis(x), axis::ds4_axis(y));
    }

    fn update(&self) -> Result<()> {
        Ds4Pad::update(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use padlink_bus::backend::mock::{Mock, Submitted};

    fn pad() -> (Arc<Mock>, Ds4Pad) {
        let mock = Mock::new();
        let bus = Bus::open(mock.clone()).unwrap();
        (mock, Ds4Pad::new(bus).unwrap())
    }

    #[test]
    fn float_joystick_inverts_y() {
        let (_mock, mut pad) = pad();
        pad.left_joystick_float(1.0, 1.0);
        assert_eq!(pad.report().thumb_lx, 255);
        assert_eq!(pad.report().thumb_ly, 1);
        pad.left_joystick_float(-1.0, -1.0);
        assert_eq!(pad.report().thumb_lx, 1);
        assert_eq!(pad.report().thumb_ly, 255);
        pad.right_joystick_float(0.0, 0.0);
        assert_eq!((pad.report().thumb_rx, pad.report().thumb_ry), (128, 128));
    }

    #[test]
    fn dpad_buttons_combine_into_compass() {
        let (_mock, mut pad) = pad();
        pad.press_button(Ds4Buttons::TRIANGLE);
        pad.set_button(StandardButton::DpadUp, true);
        pad.set_button(StandardButton::DpadRight, true);
        assert_eq!(pad.report().dpad(), Ds4Dpad::NorthEast);
        pad.set_button(StandardButton::DpadUp, false);
        assert_eq!(pad.report().dpad(), Ds4Dpad::East);
        pad.set_button(StandardButton::DpadRight, false);
        assert_eq!(pad.report().dpad(), Ds4Dpad::None);
        assert!(pad.report().is_pressed(Ds4Buttons::TRIANGLE));
    }

    #[test]
    fn guide_is_the_ps_button() {
        let (_mock, mut pad) = pad();
        pad.set_button(StandardButton::Guide, true);
        assert_eq!(pad.report().special, Ds4SpecialButtons::PS.bits());
        assert_eq!(pad.report().buttons, Ds4Dpad::None as u16);
        pad.set_button(StandardButton::Guide, false);
        assert_eq!(pad.report().special, 0);
    }

    #[test]
    fn standard_trigger_sets_bit_and_value() {
        let (_mock, mut pad) = pad();
        pad.set_button(StandardButton::RightTrigger, true);
        assert!(pad.report().is_pressed(Ds4Buttons::TRIGGER_RIGHT));
        assert_eq!(pad.report().trigger_r, 255);
    }

    #[test]
    fn opposing_dpad_buttons_keep_the_held_direction() {
        let (_mock, mut pad) = pad();
        pad.set_button(StandardButton::DpadLeft, true);
        let before = pad.report().buttons;
        assert_eq!(pad.report().dpad(), Ds4Dpad::West);
        pad.set_button(StandardButton::DpadRight, true);
        assert_eq!(pad.report().dpad(), Ds4Dpad::None);
        pad.set_button(StandardButton::DpadRight, false);
        assert_eq!(pad.report().dpad(), Ds4Dpad::West);
        assert_eq!(pad.report().buttons, before);
    }

    #[test]
    fn reset_forgets_held_directions() {
        let (_mock, mut pad) = pad();
        pad.set_button(StandardButton::DpadUp, true);
        pad.set_button(StandardButton::DpadDown, true);
        pad.reset();
        pad.set_button(StandardButton::DpadDown, false);
        assert_eq!(pad.report(), &Ds4Report::NEUTRAL);
    }

    #[test]
    fn directional_pad_then_buttons() {
        let (_mock, mut pad) = pad();
        pad.directional_pad(Ds4Dpad::SouthWest);
        assert_eq!(pad.report().dpad(), Ds4Dpad::SouthWest);
        pad.set_button(StandardButton::DpadLeft, false);
        assert_eq!(pad.report().dpad(), Ds4Dpad::South);
        pad.directional_pad(Ds4Dpad::None);
        pad.set_button(StandardButton::DpadUp, true);
        assert_eq!(pad.report().dpad(), Ds4Dpad::North);
    }

    #[test]
    fn touchpad_click_is_special() {
        let (mock, mut pad) = pad();
        pad.press_special_button(Ds4SpecialButtons::TOUCHPAD);
        pad.update().unwrap();
        let Some(Submitted::Ds4(r)) = mock.last_report(pad.target().id()) else {
            panic!("no ds4 report")
        };
        assert_eq!(r.special, Ds4SpecialButtons::TOUCHPAD.bits());
        assert_eq!(r.buttons, Ds4Dpad::None as u16);
        pad.release_special_button(Ds4SpecialButtons::TOUCHPAD);
        assert_eq!(pad.report().special, 0);
    }

    #[test]
    fn float_trigger_follows_digital_bit() {
        let (_mock, mut pad) = pad();
        pad.left_trigger_float(0.5);
        assert!(pad.report().is_pressed(Ds4Buttons::TRIGGER_LEFT));
        assert_eq!(pad.report().trigger_l, 128);
        pad.left_trigger_float(0.0);
        assert!(!pad.report().is_pressed(Ds4Buttons::TRIGGER_LEFT));
        assert_eq!(pad.report().trigger_l, 0);
        pad.right_trigger_float(1.0);
        assert!(pad.report().is_pressed(Ds4Buttons::TRIGGER_RIGHT));
    }

    #[test]
    fn extended_report_reaches_driver() {
        let (mock, pad) = pad();
        let mut ex = Ds4ReportEx::default();
        ex.battery_level = 0x0B;
        ex.gyro = [1, -2, 3];
        pad.update_extended_report(&ex).unwrap();
        assert_eq!(mock.last_report(pad.target().id()), Some(Submitted::Ds4Ex(ex)));
        // The basic report is unaffected.
        assert_eq!(pad.report(), &Ds4Report::NEUTRAL);
    }
}
