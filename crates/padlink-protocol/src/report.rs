use crate::{Ds4Buttons, Ds4SpecialButtons, XusbButtons};

pub const X360_REPORT_SIZE: usize = 12;
pub const DS4_REPORT_SIZE: usize = 9;
pub const DS4_REPORT_EX_SIZE: usize = 63;
pub const DS4_TOUCH_SIZE: usize = 9;

/// Largest value a 12-bit touch coordinate can carry.
pub const TOUCH_COORD_MAX: u16 = 0x0FFF;

const DPAD_MASK: u16 = 0x000F;

/// Xbox 360 (XUSB) input report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct X360Report {
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

impl X360Report {
    pub const NEUTRAL: Self = Self {
        buttons: 0,
        left_trigger: 0,
        right_trigger: 0,
        thumb_lx: 0,
        thumb_ly: 0,
        thumb_rx: 0,
        thumb_ry: 0,
    };

    #[inline]
    pub fn press(&mut self, buttons: XusbButtons) {
        self.buttons |= buttons.bits();
    }

    #[inline]
    pub fn release(&mut self, buttons: XusbButtons) {
        self.buttons &= !buttons.bits();
    }

    #[inline]
    pub fn is_pressed(&self, buttons: XusbButtons) -> bool {
        self.buttons & buttons.bits() == buttons.bits()
    }

    pub fn to_bytes(&self) -> [u8; X360_REPORT_SIZE] {
        let mut b = [0u8; X360_REPORT_SIZE];
        b[0..2].copy_from_slice(&self.buttons.to_le_bytes());
        b[2] = self.left_trigger;
        b[3] = self.right_trigger;
        b[4..6].copy_from_slice(&self.thumb_lx.to_le_bytes());
        b[6..8].copy_from_slice(&self.thumb_ly.to_le_bytes());
        b[8..10].copy_from_slice(&self.thumb_rx.to_le_bytes());
        b[10..12].copy_from_slice(&self.thumb_ry.to_le_bytes());
        b
    }
}

impl From<[u8; X360_REPORT_SIZE]> for X360Report {
    fn from(b: [u8; X360_REPORT_SIZE]) -> Self {
        Self {
            buttons: u16::from_le_bytes([b[0], b[1]]),
            left_trigger: b[2],
            right_trigger: b[3],
            thumb_lx: i16::from_le_bytes([b[4], b[5]]),
            thumb_ly: i16::from_le_bytes([b[6], b[7]]),
            thumb_rx: i16::from_le_bytes([b[8], b[9]]),
            thumb_ry: i16::from_le_bytes([b[10], b[11]]),
        }
    }
}

/// DualShock 4 hat value, stored in the low nibble of the button word.
/// Directions run clockwise from due north; `None` is the released hat.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Ds4Dpad {
    North = 0,
    NorthEast = 1,
    East = 2,
    SouthEast = 3,
    South = 4,
    SouthWest = 5,
    West = 6,
    NorthWest = 7,
    #[default]
    None = 8,
}

impl Ds4Dpad {
    /// Values above 8 are not valid hat positions and decode as released.
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0x0F {
            0 => Self::North,
            1 => Self::NorthEast,
            2 => Self::East,
            3 => Self::SouthEast,
            4 => Self::South,
            5 => Self::SouthWest,
            6 => Self::West,
            7 => Self::NorthWest,
            _ => Self::None,
        }
    }

    /// Combine four discrete direction flags. Opposing flags cancel out.
    pub fn from_directions(up: bool, down: bool, left: bool, right: bool) -> Self {
        let vertical = i8::from(up) - i8::from(down);
        let horizontal = i8::from(right) - i8::from(left);
        match (vertical, horizontal) {
            (1, 0) => Self::North,
            (1, 1) => Self::NorthEast,
            (0, 1) => Self::East,
            (-1, 1) => Self::SouthEast,
            (-1, 0) => Self::South,
            (-1, -1) => Self::SouthWest,
            (0, -1) => Self::West,
            (1, -1) => Self::NorthWest,
            _ => Self::None,
        }
    }

    /// `(up, down, left, right)`.
    pub fn directions(self) -> (bool, bool, bool, bool) {
        match self {
            Self::North => (true, false, false, false),
            Self::NorthEast => (true, false, false, true),
            Self::East => (false, false, false, true),
            Self::SouthEast => (false, true, false, true),
            Self::South => (false, true, false, false),
            Self::SouthWest => (false, true, true, false),
            Self::West => (false, false, true, false),
            Self::NorthWest => (true, false, true, false),
            Self::None => (false, false, false, false),
        }
    }
}

/// DualShock 4 input report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ds4Report {
    pub thumb_lx: u8,
    pub thumb_ly: u8,
    pub thumb_rx: u8,
    pub thumb_ry: u8,
    pub buttons: u16,
    pub special: u8,
    pub trigger_l: u8,
    pub trigger_r: u8,
}

impl Default for Ds4Report {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl Ds4Report {
    /// Sticks centred, every button released, hat released.
    pub const NEUTRAL: Self = Self {
        thumb_lx: 0x80,
        thumb_ly: 0x80,
        thumb_rx: 0x80,
        thumb_ry: 0x80,
        buttons: Ds4Dpad::None as u16,
        special: 0,
        trigger_l: 0,
        trigger_r: 0,
    };

    #[inline]
    pub fn press(&mut self, buttons: Ds4Buttons) {
        self.buttons |= buttons.bits();
    }

    #[inline]
    pub fn release(&mut self, buttons: Ds4Buttons) {
        self.buttons &= !buttons.bits();
    }

    #[inline]
    pub fn is_pressed(&self, buttons: Ds4Buttons) -> bool {
        self.buttons & buttons.bits() == buttons.bits()
    }

    #[inline]
    pub fn press_special(&mut self, buttons: Ds4SpecialButtons) {
        self.special |= buttons.bits();
    }

    #[inline]
    pub fn release_special(&mut self, buttons: Ds4SpecialButtons) {
        self.special &= !buttons.bits();
    }

    /// Overwrites the low nibble only; the upper twelve button bits are kept.
    #[inline]
    pub fn set_dpad(&mut self, dpad: Ds4Dpad) {
        self.buttons = (self.buttons & !DPAD_MASK) | dpad as u16;
    }

    #[inline]
    pub fn dpad(&self) -> Ds4Dpad {
        Ds4Dpad::from_nibble((self.buttons & DPAD_MASK) as u8)
    }

    pub fn to_bytes(&self) -> [u8; DS4_REPORT_SIZE] {
        let [b_lo, b_hi] = self.buttons.to_le_bytes();
        [
            self.thumb_lx,
            self.thumb_ly,
            self.thumb_rx,
            self.thumb_ry,
            b_lo,
            b_hi,
            self.special,
            self.trigger_l,
            self.trigger_r,
        ]
    }
}

impl From<[u8; DS4_REPORT_SIZE]> for Ds4Report {
    fn from(b: [u8; DS4_REPORT_SIZE]) -> Self {
        Self {
            thumb_lx: b[0],
            thumb_ly: b[1],
            thumb_rx: b[2],
            thumb_ry: b[3],
            buttons: u16::from_le_bytes([b[4], b[5]]),
            special: b[6],
            trigger_l: b[7],
            trigger_r: b[8],
        }
    }
}

/// Pack two 12-bit touch coordinates into the three-byte layout the
/// touchpad report uses:
///
/// ```text
/// byte 0: x[7:0]
/// byte 1: y[3:0] << 4 | x[11:8]
/// byte 2: y[11:4]
/// ```
#[inline]
pub fn pack_touch_coords(x: u16, y: u16) -> [u8; 3] {
    [
        (x & 0x00FF) as u8,
        (((x >> 8) & 0x000F) | ((y & 0x000F) << 4)) as u8,
        ((y >> 4) & 0x00FF) as u8,
    ]
}

#[inline]
pub fn unpack_touch_coords(b: [u8; 3]) -> (u16, u16) {
    let x = u16::from(b[0]) | (u16::from(b[1] & 0x0F) << 8);
    let y = u16::from(b[1] >> 4) | (u16::from(b[2]) << 4);
    (x, y)
}

/// One finger on the touchpad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TouchPoint {
    /// Bit 7 set means the finger is lifted (active low); bits 0..=6 are
    /// the tracking number, bumped on every new press.
    pub is_up_tracking_num: u8,
    pub x: u16,
    pub y: u16,
}

impl Default for TouchPoint {
    fn default() -> Self {
        Self::RELEASED
    }
}

impl TouchPoint {
    pub const RELEASED: Self = Self { is_up_tracking_num: 0x80, x: 0, y: 0 };

    pub fn down(tracking_num: u8, x: u16, y: u16) -> Self {
        Self { is_up_tracking_num: tracking_num & 0x7F, x, y }
    }

    fn write(&self, out: &mut [u8]) {
        out[0] = self.is_up_tracking_num;
        out[1..4].copy_from_slice(&pack_touch_coords(self.x, self.y));
    }

    fn read(b: &[u8]) -> Self {
        let (x, y) = unpack_touch_coords([b[1], b[2], b[3]]);
        Self { is_up_tracking_num: b[0], x, y }
    }
}

/// One touchpad sample: a packet counter and up to two fingers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ds4Touch {
    pub packet_counter: u8,
    pub fingers: [TouchPoint; 2],
}

impl Ds4Touch {
    pub fn to_bytes(&self) -> [u8; DS4_TOUCH_SIZE] {
        let mut b = [0u8; DS4_TOUCH_SIZE];
        b[0] = self.packet_counter;
        self.fingers[0].write(&mut b[1..5]);
        self.fingers[1].write(&mut b[5..9]);
        b
    }

    pub fn from_bytes(b: &[u8; DS4_TOUCH_SIZE]) -> Self {
        Self {
            packet_counter: b[0],
            fingers: [TouchPoint::read(&b[1..5]), TouchPoint::read(&b[5..9])],
        }
    }
}

/// Full DualShock 4 v1 input report, including motion sensors and touch history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ds4ReportEx {
    pub report: Ds4Report,
    pub timestamp: u16,
    pub battery_level: u8,
    /// X, Y, Z.
    pub gyro: [i16; 3],
    /// X, Y, Z.
    pub accel: [i16; 3],
    pub battery_level_special: u8,
    /// Number of touch records carried, 0..=3 over USB.
    pub touch_packets: u8,
    pub current_touch: Ds4Touch,
    pub previous_touch: [Ds4Touch; 2],
}

impl Ds4ReportEx {
    pub fn to_bytes(&self) -> [u8; DS4_REPORT_EX_SIZE] {
        let mut b = [0u8; DS4_REPORT_EX_SIZE];
        b[0..9].copy_from_slice(&self.report.to_bytes());
        b[9..11].copy_from_slice(&self.timestamp.to_le_bytes());
        b[11] = self.battery_level;
        for (i, v) in self.gyro.iter().enumerate() {
            b[12 + i * 2..14 + i * 2].copy_from_slice(&v.to_le_bytes());
        }
        for (i, v) in self.accel.iter().enumerate() {
            b[18 + i * 2..20 + i * 2].copy_from_slice(&v.to_le_bytes());
        }
        // 24..29 reserved
        b[29] = self.battery_level_special;
        // 30..32 reserved
        b[32] = self.touch_packets;
        b[33..42].copy_from_slice(&self.current_touch.to_bytes());
        b[42..51].copy_from_slice(&self.previous_touch[0].to_bytes());
        b[51..60].copy_from_slice(&self.previous_touch[1].to_bytes());
        b
    }
}

impl From<&[u8; DS4_REPORT_EX_SIZE]> for Ds4ReportEx {
    fn from(b: &[u8; DS4_REPORT_EX_SIZE]) -> Self {
        let word = |at: usize| i16::from_le_bytes([b[at], b[at + 1]]);
        let touch = |at: usize| {
            let mut t = [0u8; DS4_TOUCH_SIZE];
            t.copy_from_slice(&b[at..at + DS4_TOUCH_SIZE]);
            Ds4Touch::from_bytes(&t)
        };
        let mut base = [0u8; DS4_REPORT_SIZE];
        base.copy_from_slice(&b[0..9]);
        Self {
            report: Ds4Report::from(base),
            timestamp: u16::from_le_bytes([b[9], b[10]]),
            battery_level: b[11],
            gyro: [word(12), word(14), word(16)],
            accel: [word(18), word(20), word(22)],
            battery_level_special: b[29],
            touch_packets: b[32],
            current_touch: touch(33),
            previous_touch: [touch(42), touch(51)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x360_zeroed_report() {
        let r = X360Report::NEUTRAL;
        let bytes = r.to_bytes();
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes, [0u8; 12]);
        assert_eq!(X360Report::default(), X360Report::NEUTRAL);
    }

    #[test]
    fn x360_buttons_and_axes() {
        let r = X360Report {
            buttons: 0b1010_0000_0000_0011,
            left_trigger: 255,
            right_trigger: 17,
            thumb_lx: 123,
            thumb_ly: -456,
            thumb_rx: 32767,
            thumb_ry: -32768,
        };
        let bytes = r.to_bytes();

        assert_eq!(&bytes[0..2], &r.buttons.to_le_bytes());
        assert_eq!(bytes[2], 255);
        assert_eq!(bytes[3], 17);
        assert_eq!(&bytes[4..6], &r.thumb_lx.to_le_bytes());
        assert_eq!(&bytes[6..8], &r.thumb_ly.to_le_bytes());
        assert_eq!(&bytes[8..10], &r.thumb_rx.to_le_bytes());
        assert_eq!(&bytes[10..12], &r.thumb_ry.to_le_bytes());
        assert_eq!(X360Report::from(bytes), r);
    }

    #[test]
    fn x360_press_is_idempotent() {
        let mut r = X360Report::NEUTRAL;
        r.press(XusbButtons::A);
        r.press(XusbButtons::A);
        assert_eq!(r.buttons, 0x1000);
        r.release(XusbButtons::B);
        assert_eq!(r.buttons, 0x1000);
        assert!(r.is_pressed(XusbButtons::A));
    }

    #[test]
    fn ds4_neutral_layout() {
        let bytes = Ds4Report::NEUTRAL.to_bytes();
        assert_eq!(bytes, [0x80, 0x80, 0x80, 0x80, 0x08, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(Ds4Report::NEUTRAL.dpad(), Ds4Dpad::None);
    }

    #[test]
    fn ds4_dpad_keeps_upper_bits() {
        let mut r = Ds4Report::NEUTRAL;
        r.press(Ds4Buttons::CROSS | Ds4Buttons::THUMB_RIGHT);
        r.set_dpad(Ds4Dpad::SouthWest);
        assert_eq!(r.buttons, 0x8020 | 5);
        assert_eq!(r.dpad(), Ds4Dpad::SouthWest);
        r.set_dpad(Ds4Dpad::None);
        assert_eq!(r.buttons, 0x8028);
    }

    #[test]
    fn dpad_directions_roundtrip() {
        for nibble in 0..=8u8 {
            let d = Ds4Dpad::from_nibble(nibble);
            let (u, dn, l, r) = d.directions();
            assert_eq!(Ds4Dpad::from_directions(u, dn, l, r), d);
        }
        assert_eq!(Ds4Dpad::from_nibble(0x0C), Ds4Dpad::None);
        assert_eq!(Ds4Dpad::from_directions(true, true, false, true), Ds4Dpad::East);
    }

    #[test]
    fn touch_packing_matches_layout() {
        // x = 0xABC, y = 0x123
        assert_eq!(pack_touch_coords(0xABC, 0x123), [0xBC, 0x3A, 0x12]);
        assert_eq!(unpack_touch_coords([0xBC, 0x3A, 0x12]), (0xABC, 0x123));
        assert_eq!(pack_touch_coords(TOUCH_COORD_MAX, TOUCH_COORD_MAX), [0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn ds4_ex_offsets() {
        let mut ex = Ds4ReportEx::default();
        ex.report.trigger_r = 0x42;
        ex.timestamp = 0x0201;
        ex.battery_level = 0x0B;
        ex.gyro = [1, -1, 0x0304];
        ex.accel = [0, 0, -2];
        ex.battery_level_special = 0x1B;
        ex.touch_packets = 1;
        ex.current_touch = Ds4Touch {
            packet_counter: 7,
            fingers: [TouchPoint::down(3, 1919, 942), TouchPoint::RELEASED],
        };

        let b = ex.to_bytes();
        assert_eq!(b.len(), 63);
        assert_eq!(b[8], 0x42);
        assert_eq!(&b[9..11], &[0x01, 0x02]);
        assert_eq!(b[11], 0x0B);
        assert_eq!(&b[12..18], &[0x01, 0x00, 0xFF, 0xFF, 0x04, 0x03]);
        assert_eq!(&b[22..24], &[0xFE, 0xFF]);
        assert_eq!(b[29], 0x1B);
        assert_eq!(b[32], 1);
        assert_eq!(b[33], 7);
        assert_eq!(b[34], 3);
        assert_eq!(b[38], 0x80);
        assert_eq!(b[42 + 1], 0x80);
        assert_eq!(&b[60..63], &[0, 0, 0]);
        assert_eq!(Ds4ReportEx::from(&b), ex);
    }
}
