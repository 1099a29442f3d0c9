//! Controller-neutral button naming used by remote clients.

use std::fmt;
use std::str::FromStr;

/// The 17 buttons of a standard-mapping gamepad, numbered as the remote
/// client sends them.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StandardButton {
    A = 0,
    B = 1,
    X = 2,
    Y = 3,
    LeftShoulder = 4,
    RightShoulder = 5,
    LeftTrigger = 6,
    RightTrigger = 7,
    Back = 8,
    Start = 9,
    LeftThumb = 10,
    RightThumb = 11,
    DpadUp = 12,
    DpadDown = 13,
    DpadLeft = 14,
    DpadRight = 15,
    Guide = 16,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown button {0:?}")]
pub struct UnknownButton(pub String);

impl StandardButton {
    pub const ALL: [Self; 17] = [
        Self::A,
        Self::B,
        Self::X,
        Self::Y,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftTrigger,
        Self::RightTrigger,
        Self::Back,
        Self::Start,
        Self::LeftThumb,
        Self::RightThumb,
        Self::DpadUp,
        Self::DpadDown,
        Self::DpadLeft,
        Self::DpadRight,
        Self::Guide,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
            Self::X => "x",
            Self::Y => "y",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftTrigger => "left_trigger",
            Self::RightTrigger => "right_trigger",
            Self::Back => "back",
            Self::Start => "start",
            Self::LeftThumb => "left_thumb",
            Self::RightThumb => "right_thumb",
            Self::DpadUp => "dpad_up",
            Self::DpadDown => "dpad_down",
            Self::DpadLeft => "dpad_left",
            Self::DpadRight => "dpad_right",
            Self::Guide => "guide",
        }
    }

    /// Triggers are analog on both pads; pressing one means full travel.
    pub fn is_trigger(self) -> bool {
        matches!(self, Self::LeftTrigger | Self::RightTrigger)
    }

    pub fn is_dpad(self) -> bool {
        matches!(self, Self::DpadUp | Self::DpadDown | Self::DpadLeft | Self::DpadRight)
    }
}

impl fmt::Display for StandardButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts the numeric index (`"6"`) or the name, case-insensitively, with
/// `-` or `_` separators (`"Left-Trigger"`).
impl FromStr for StandardButton {
    type Err = UnknownButton;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(i) = s.parse::<usize>() {
            return Self::from_index(i).ok_or_else(|| UnknownButton(s.to_owned()));
        }
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|b| b.name() == wanted)
            .ok_or_else(|| UnknownButton(s.to_owned()))
    }
}
