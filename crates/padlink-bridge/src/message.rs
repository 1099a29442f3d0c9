use padlink_gamepad::{Gamepad, StandardButton};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// One state snapshot from the remote client.
///
/// Sticks are `-1.0..=1.0`. Keys `"0"` to `"16"` carry a standard button:
/// a bool presses or releases it, a number on a trigger key sets the analog
/// value.
#[derive(Debug, Default, Deserialize)]
pub struct PadMessage {
    #[serde(default)]
    pub lx: f64,
    #[serde(default)]
    pub ly: f64,
    #[serde(default)]
    pub rx: f64,
    #[serde(default)]
    pub ry: f64,
    #[serde(flatten)]
    pub buttons: BTreeMap<String, Value>,
}

impl PadMessage {
    pub fn apply(&self, pad: &mut dyn Gamepad) {
        pad.left_joystick_float(self.lx, self.ly);
        pad.right_joystick_float(self.rx, self.ry);

        for (key, value) in &self.buttons {
            let Some(button) = key.parse().ok().and_then(StandardButton::from_index) else {
                debug!(key, "ignoring unknown field");
                continue;
            };
            match value {
                Value::Bool(pressed) => pad.set_button(button, *pressed),
                Value::Number(n) if button.is_trigger() => {
                    let v = n.as_f64().unwrap_or(0.0);
                    if button == StandardButton::LeftTrigger {
                        pad.left_trigger_float(v);
                    } else {
                        pad.right_trigger_float(v);
                    }
                }
                other => debug!(%button, value = %other, "ignoring unsupported button value"),
            }
        }
    }
}

/// Force-feedback state sent back to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackMessage {
    pub lm: u8,
    pub sm: u8,
    pub led: u8,
}
