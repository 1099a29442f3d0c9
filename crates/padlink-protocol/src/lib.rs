//! Wire-level vocabulary shared by the bus and gamepad layers: target kinds,
//! button masks, report layouts and the driver's status words.
//!
//! Nothing in this crate performs I/O. Every type here is a plain value that
//! the upper layers mutate and hand to a bus backend.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod abi;
pub mod axis;
pub mod report;

pub use report::{Ds4Dpad, Ds4Report, Ds4ReportEx, Ds4Touch, TouchPoint, X360Report};

/// Emulated controller family. The discriminants are the driver's own
/// `VIGEM_TARGET_TYPE` values; 1 is skipped on the driver side as well.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    #[serde(alias = "x360")]
    Xbox360Wired = 0,
    #[serde(alias = "ds4")]
    DualShock4Wired = 2,
}

impl TargetType {
    /// USB vendor id the bus advertises unless overridden before plug-in.
    pub const fn default_vendor_id(self) -> u16 {
        match self {
            Self::Xbox360Wired => 0x045E,
            Self::DualShock4Wired => 0x054C,
        }
    }

    /// USB product id the bus advertises unless overridden before plug-in.
    pub const fn default_product_id(self) -> u16 {
        match self {
            Self::Xbox360Wired => 0x028E,
            Self::DualShock4Wired => 0x05C4,
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xbox360Wired => f.write_str("xbox360"),
            Self::DualShock4Wired => f.write_str("dualshock4"),
        }
    }
}

bitflags::bitflags! {
    /// XInput-compatible button mask (`wButtons` of the 360 report).
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct XusbButtons: u16 {
        const DPAD_UP        = 0x0001;
        const DPAD_DOWN      = 0x0002;
        const DPAD_LEFT      = 0x0004;
        const DPAD_RIGHT     = 0x0008;
        const START          = 0x0010;
        const BACK           = 0x0020;
        const LEFT_THUMB     = 0x0040;
        const RIGHT_THUMB    = 0x0080;
        const LEFT_SHOULDER  = 0x0100;
        const RIGHT_SHOULDER = 0x0200;
        const GUIDE          = 0x0400;
        const A              = 0x1000;
        const B              = 0x2000;
        const X              = 0x4000;
        const Y              = 0x8000;
    }
}

bitflags::bitflags! {
    /// DualShock 4 digital buttons. The low nibble of the same word carries
    /// the d-pad compass value and is never part of this mask.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Ds4Buttons: u16 {
        const SQUARE         = 1 << 4;
        const CROSS          = 1 << 5;
        const CIRCLE         = 1 << 6;
        const TRIANGLE       = 1 << 7;
        const SHOULDER_LEFT  = 1 << 8;
        const SHOULDER_RIGHT = 1 << 9;
        const TRIGGER_LEFT   = 1 << 10;
        const TRIGGER_RIGHT  = 1 << 11;
        const SHARE          = 1 << 12;
        const OPTIONS        = 1 << 13;
        const THUMB_LEFT     = 1 << 14;
        const THUMB_RIGHT    = 1 << 15;
    }
}

bitflags::bitflags! {
    /// Buttons reported outside the main DualShock 4 mask.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Ds4SpecialButtons: u8 {
        const PS       = 1 << 0;
        const TOUCHPAD = 1 << 1;
    }
}

/// Status word returned by every fallible driver-client call.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DriverStatus {
    None = 0x2000_0000,
    BusNotFound = 0xE000_0001,
    NoFreeSlot = 0xE000_0002,
    InvalidTarget = 0xE000_0003,
    RemovalFailed = 0xE000_0004,
    AlreadyConnected = 0xE000_0005,
    TargetUninitialized = 0xE000_0006,
    TargetNotPluggedIn = 0xE000_0007,
    BusVersionMismatch = 0xE000_0008,
    BusAccessFailed = 0xE000_0009,
    CallbackAlreadyRegistered = 0xE000_0010,
    CallbackNotFound = 0xE000_0011,
    BusAlreadyConnected = 0xE000_0012,
    BusInvalidHandle = 0xE000_0013,
    XusbUserIndexOutOfRange = 0xE000_0014,
    InvalidParameter = 0xE000_0015,
    NotSupported = 0xE000_0016,
}

impl DriverStatus {
    const ALL: [Self; 17] = [
        Self::None,
        Self::BusNotFound,
        Self::NoFreeSlot,
        Self::InvalidTarget,
        Self::RemovalFailed,
        Self::AlreadyConnected,
        Self::TargetUninitialized,
        Self::TargetNotPluggedIn,
        Self::BusVersionMismatch,
        Self::BusAccessFailed,
        Self::CallbackAlreadyRegistered,
        Self::CallbackNotFound,
        Self::BusAlreadyConnected,
        Self::BusInvalidHandle,
        Self::XusbUserIndexOutOfRange,
        Self::InvalidParameter,
        Self::NotSupported,
    ];

    pub fn from_raw(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    #[inline]
    pub const fn code(self) -> u32 {
        self as u32
    }

    #[inline]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::None)
    }

    /// The driver's symbolic name, e.g. `VIGEM_ERROR_NO_FREE_SLOT`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "VIGEM_ERROR_NONE",
            Self::BusNotFound => "VIGEM_ERROR_BUS_NOT_FOUND",
            Self::NoFreeSlot => "VIGEM_ERROR_NO_FREE_SLOT",
            Self::InvalidTarget => "VIGEM_ERROR_INVALID_TARGET",
            Self::RemovalFailed => "VIGEM_ERROR_REMOVAL_FAILED",
            Self::AlreadyConnected => "VIGEM_ERROR_ALREADY_CONNECTED",
            Self::TargetUninitialized => "VIGEM_ERROR_TARGET_UNINITIALIZED",
            Self::TargetNotPluggedIn => "VIGEM_ERROR_TARGET_NOT_PLUGGED_IN",
            Self::BusVersionMismatch => "VIGEM_ERROR_BUS_VERSION_MISMATCH",
            Self::BusAccessFailed => "VIGEM_ERROR_BUS_ACCESS_FAILED",
            Self::CallbackAlreadyRegistered => "VIGEM_ERROR_CALLBACK_ALREADY_REGISTERED",
            Self::CallbackNotFound => "VIGEM_ERROR_CALLBACK_NOT_FOUND",
            Self::BusAlreadyConnected => "VIGEM_ERROR_BUS_ALREADY_CONNECTED",
            Self::BusInvalidHandle => "VIGEM_ERROR_BUS_INVALID_HANDLE",
            Self::XusbUserIndexOutOfRange => "VIGEM_ERROR_XUSB_USERINDEX_OUT_OF_RANGE",
            Self::InvalidParameter => "VIGEM_ERROR_INVALID_PARAMETER",
            Self::NotSupported => "VIGEM_ERROR_NOT_SUPPORTED",
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#010x})", self.name(), self.code())
    }
}
