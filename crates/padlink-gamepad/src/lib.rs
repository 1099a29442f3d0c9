//! Virtual gamepads on a shared [`Bus`].
//!
//! Each pad owns one plugged target and an in-memory report. Setters only
//! touch the report; nothing reaches the driver until [`Gamepad::update`].
//!
//! ```no_run
//! use padlink_bus::{Bus, BackendKind};
//! use padlink_gamepad::{Gamepad, StandardButton, X360Pad};
//!
//! # fn main() -> padlink_bus::Result<()> {
//! let bus = Bus::open_kind(BackendKind::Vigem, None)?;
//! let mut pad = X360Pad::new(bus)?;
//! pad.set_button(StandardButton::A, true);
//! pad.left_joystick_float(0.0, 1.0);
//! pad.update()?;
//! # Ok(())
//! # }
//! ```

mod ds4;
pub mod layout;
mod notification;
mod target;
mod x360;

use std::sync::Arc;

use padlink_bus::{Bus, Result};
use padlink_protocol::TargetType;

pub use ds4::Ds4Pad;
pub use layout::{StandardButton, UnknownButton};
pub use notification::{NotificationFn, UserData};
pub use target::{Detach, TargetHandle, TargetOptions, TargetState, VirtualTarget};
pub use x360::X360Pad;

/// Operations common to both pad kinds, usable through `dyn Gamepad`.
pub trait Gamepad: Send {
    fn kind(&self) -> TargetType;
    fn target(&self) -> &VirtualTarget;
    fn target_mut(&mut self) -> &mut VirtualTarget;

    /// Back to the neutral report. Not sent until the next update.
    fn reset(&mut self);
    fn set_button(&mut self, button: StandardButton, pressed: bool);
    /// `0.0..=1.0`.
    fn left_trigger_float(&mut self, value: f64);
    fn right_trigger_float(&mut self, value: f64);
    /// `-1.0..=1.0` on both axes, up is positive `y`.
    fn left_joystick_float(&mut self, x: f64, y: f64);
    fn right_joystick_float(&mut self, x: f64, y: f64);

    /// Send the current report.
    fn update(&self) -> Result<()>;

    fn register_notification(&mut self, callback: Arc<NotificationFn>) -> Result<()> {
        self.target_mut().register_notification(callback)
    }

    fn unregister_notification(&mut self) {
        self.target_mut().unregister_notification()
    }

    /// Unplug the pad. The allocation itself is released on drop.
    fn close(&mut self) -> Result<Detach> {
        self.target_mut().detach()
    }
}

/// Plug in a pad of `kind` and return it behind the common interface.
pub fn create(
    bus: Arc<Bus>,
    kind: TargetType,
    options: &TargetOptions,
) -> Result<Box<dyn Gamepad>> {
    Ok(match kind {
        TargetType::Xbox360Wired => Box::new(X360Pad::with_options(bus, options)?),
        TargetType::DualShock4Wired => Box::new(Ds4Pad::with_options(bus, options)?),
    })
}
