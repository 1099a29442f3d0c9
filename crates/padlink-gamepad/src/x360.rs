use crate::Gamepad;
use crate::layout::StandardButton;
use crate::target::{TargetOptions, VirtualTarget};
use padlink_bus::{Bus, Result};
use padlink_protocol::{TargetType, X360Report, XusbButtons, axis};
use std::sync::Arc;
use tracing::trace;

/// Wired Xbox 360 controller.
#[derive(Debug)]
pub struct X360Pad {
    target: VirtualTarget,
    report: X360Report,
}

impl X360Pad {
    pub fn new(bus: Arc<Bus>) -> Result<Self> {
        Self::with_options(bus, &TargetOptions::default())
    }

    /// Plug in and send one neutral report.
    pub fn with_options(bus: Arc<Bus>, options: &TargetOptions) -> Result<Self> {
        let target = VirtualTarget::attach(bus, TargetType::Xbox360Wired, options)?;
        let pad = Self { target, report: X360Report::NEUTRAL };
        pad.update()?;
        Ok(pad)
    }

    /// The in-memory report, as the next [`update`](Self::update) will send it.
    pub fn report(&self) -> &X360Report {
        &self.report
    }

    pub fn press_button(&mut self, button: XusbButtons) {
        self.report.press(button);
    }

    pub fn release_button(&mut self, button: XusbButtons) {
        self.report.release(button);
    }

    pub fn left_trigger(&mut self, value: u8) {
        self.report.left_trigger = value;
    }

    pub fn right_trigger(&mut self, value: u8) {
        self.report.right_trigger = value;
    }

    /// Raw axis values, stored as given.
    pub fn left_joystick(&mut self, x: i16, y: i16) {
        self.report.thumb_lx = x;
        self.report.thumb_ly = y;
    }

    pub fn right_joystick(&mut self, x: i16, y: i16) {
        self.report.thumb_rx = x;
        self.report.thumb_ry = y;
    }

    /// XInput player slot the system assigned to this pad.
    pub fn user_index(&self) -> Result<u32> {
        self.target.bus().backend().x360_user_index(self.target.id())
    }

    pub fn update(&self) -> Result<()> {
        trace!(id = %self.target.id(), report = ?self.report, "x360 commit");
        self.target.commit_with(|backend, id| backend.x360_update(id, &self.report))
    }
}

fn button_mask(button: StandardButton) -> XusbButtons {
    match button {
        StandardButton::A => XusbButtons::A,
        StandardButton::B => XusbButtons::B,
        StandardButton::X => XusbButtons::X,
        StandardButton::Y => XusbButtons::Y,
        StandardButton::LeftShoulder => XusbButtons::LEFT_SHOULDER,
        StandardButton::RightShoulder => XusbButtons::RIGHT_SHOULDER,
        StandardButton::Back => XusbButtons::BACK,
        StandardButton::Start => XusbButtons::START,
        StandardButton::LeftThumb => XusbButtons::LEFT_THUMB,
        StandardButton::RightThumb => XusbButtons::RIGHT_THUMB,
        StandardButton::DpadUp => XusbButtons::DPAD_UP,
        StandardButton::DpadDown => XusbButtons::DPAD_DOWN,
        StandardButton::DpadLeft => XusbButtons::DPAD_LEFT,
        StandardButton::DpadRight => XusbButtons::DPAD_RIGHT,
        StandardButton::Guide => XusbButtons::GUIDE,
        // Analog on this pad, handled by the caller.
        StandardButton::LeftTrigger | StandardButton::RightTrigger => XusbButtons::empty(),
    }
}

impl Gamepad for X360Pad {
    fn kind(&self) -> TargetType {
        TargetType::Xbox360Wired
    }

    fn target(&self) -> &VirtualTarget {
        &self.target
    }

    fn target_mut(&mut self) -> &mut VirtualTarget {
        &mut self.target
    }

    fn reset(&mut self) {
        self.report = X360Report::NEUTRAL;
    }

    fn set_button(&mut self, button: StandardButton, pressed: bool) {
        let full = if pressed { u8::MAX } else { 0 };
        match button {
            StandardButton::LeftTrigger => self.left_trigger(full),
            StandardButton::RightTrigger => self.right_trigger(full),
            other if pressed => self.press_button(button_mask(other)),
            other => self.release_button(button_mask(other)),
        }
    }

    fn left_trigger_float(&mut self, value: f64) {
        self.left_trigger(axis::trigger(value));
    }

    fn right_trigger_float(&mut self, value: f64) {
        self.right_trigger(axis::trigger(value));
    }

    /// Up is positive `y`; the stored Y axis is inverted.
    fn left_joystick_float(&mut self, x: f64, y: f64) {
        self.left_joystick(axis::x360_axis(x), -axis::x360_axis(y));
    }

    fn right_joystick_float(&mut self, x: f64, y: f64) {
        self.right_joystick(axis::x360_axis(x), -axis::x360_axis(y));
    }

    fn update(&self) -> Result<()> {
        X360Pad::update(self)
    }
}
