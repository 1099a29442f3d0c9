//! C-ABI mirrors of the driver-client report structs, passed by value
//! across the shared-library boundary.

use core::mem::{align_of, size_of};

use crate::report::{DS4_REPORT_EX_SIZE, Ds4Report, Ds4ReportEx, X360Report};

const _: [(); 12] = [(); size_of::<XusbReportRaw>()];
const _: [(); 2] = [(); align_of::<XusbReportRaw>()];
const _: [(); 10] = [(); size_of::<Ds4ReportRaw>()];
const _: [(); 63] = [(); size_of::<Ds4ReportExRaw>()];
const _: [(); 3] = [(); size_of::<Ds4LightbarColor>()];

/// `XUSB_REPORT`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct XusbReportRaw {
    pub w_buttons: u16,
    pub b_left_trigger: u8,
    pub b_right_trigger: u8,
    pub s_thumb_lx: i16,
    pub s_thumb_ly: i16,
    pub s_thumb_rx: i16,
    pub s_thumb_ry: i16,
}

impl From<&X360Report> for XusbReportRaw {
    fn from(r: &X360Report) -> Self {
        Self {
            w_buttons: r.buttons,
            b_left_trigger: r.left_trigger,
            b_right_trigger: r.right_trigger,
            s_thumb_lx: r.thumb_lx,
            s_thumb_ly: r.thumb_ly,
            s_thumb_rx: r.thumb_rx,
            s_thumb_ry: r.thumb_ry,
        }
    }
}

/// `DS4_REPORT`. One trailing padding byte brings it to 10 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ds4ReportRaw {
    pub b_thumb_lx: u8,
    pub b_thumb_ly: u8,
    pub b_thumb_rx: u8,
    pub b_thumb_ry: u8,
    pub w_buttons: u16,
    pub b_special: u8,
    pub b_trigger_l: u8,
    pub b_trigger_r: u8,
}

impl From<&Ds4Report> for Ds4ReportRaw {
    fn from(r: &Ds4Report) -> Self {
        Self {
            b_thumb_lx: r.thumb_lx,
            b_thumb_ly: r.thumb_ly,
            b_thumb_rx: r.thumb_rx,
            b_thumb_ry: r.thumb_ry,
            w_buttons: r.buttons,
            b_special: r.special,
            b_trigger_l: r.trigger_l,
            b_trigger_r: r.trigger_r,
        }
    }
}

/// `DS4_REPORT_EX`, handled as its packed byte buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ds4ReportExRaw {
    pub report_buffer: [u8; DS4_REPORT_EX_SIZE],
}

impl From<&Ds4ReportEx> for Ds4ReportExRaw {
    fn from(r: &Ds4ReportEx) -> Self {
        Self { report_buffer: r.to_bytes() }
    }
}

/// `DS4_LIGHTBAR_COLOR`, delivered with DualShock notifications.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Ds4LightbarColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_x360_mirrors_report_fields() {
        let r = X360Report { buttons: 0x1000, thumb_ly: -32767, ..X360Report::NEUTRAL };
        let raw = XusbReportRaw::from(&r);
        assert_eq!(raw.w_buttons, 0x1000);
        assert_eq!(raw.s_thumb_ly, -32767);
    }

    #[test]
    fn raw_ds4_keeps_neutral_hat() {
        let raw = Ds4ReportRaw::from(&Ds4Report::NEUTRAL);
        assert_eq!(raw.w_buttons, 0x0008);
        assert_eq!(raw.b_thumb_lx, 0x80);
    }
}
