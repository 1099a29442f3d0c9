use padlink_protocol::DriverStatus;
use thiserror::Error;

/// Every failure the bus and gamepad layers surface to their caller.
#[derive(Debug, Error)]
pub enum Error {
    /// No compatible bus driver (or driver client library) could be opened.
    #[error("virtual bus driver unavailable: {0}")]
    DriverUnavailable(String),

    #[error("bus is already connected")]
    BusAlreadyConnected,

    #[error("bus is not connected")]
    BusNotConnected,

    #[error("no free slot left on the bus")]
    NoFreeSlot,

    /// The add call succeeded but the driver never reported the target live.
    #[error("target {target} was added but never reported attached")]
    AttachFailed { target: u64 },

    #[error("target is not attached")]
    NotAttached,

    #[error("report update rejected: {status}")]
    UpdateFailed { status: DriverStatus },

    #[error("notification callback does not match the expected signature")]
    InvalidCallbackSignature,

    #[error("target is not plugged in")]
    TargetNotPlugged,

    #[error("driver call failed: {status}")]
    Driver { status: DriverStatus },

    #[error("driver returned unknown status {0:#010x}")]
    UnknownStatus(u32),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// The driver status word behind this error, when there is one.
    pub fn status(&self) -> Option<DriverStatus> {
        match self {
            Self::BusAlreadyConnected => Some(DriverStatus::BusAlreadyConnected),
            Self::NoFreeSlot => Some(DriverStatus::NoFreeSlot),
            Self::TargetNotPlugged => Some(DriverStatus::TargetNotPluggedIn),
            Self::UpdateFailed { status } | Self::Driver { status } => Some(*status),
            _ => None,
        }
    }

    /// Re-tag a driver rejection of a report submission.
    pub fn into_update_failure(self) -> Self {
        match self.status() {
            Some(status) => Self::UpdateFailed { status },
            None => self,
        }
    }
}

impl From<DriverStatus> for Error {
    fn from(status: DriverStatus) -> Self {
        match status {
            DriverStatus::BusNotFound => Self::DriverUnavailable(status.to_string()),
            DriverStatus::BusAlreadyConnected => Self::BusAlreadyConnected,
            DriverStatus::NoFreeSlot => Self::NoFreeSlot,
            DriverStatus::TargetNotPluggedIn => Self::TargetNotPlugged,
            _ => Self::Driver { status },
        }
    }
}

/// Decode a raw status word returned across the driver ABI.
pub fn check(code: u32) -> Result<()> {
    match DriverStatus::from_raw(code) {
        Some(DriverStatus::None) => Ok(()),
        Some(status) => Err(status.into()),
        None => Err(Error::UnknownStatus(code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_decodes_named_kinds() {
        assert!(check(0x2000_0000).is_ok());
        assert!(matches!(check(0xE000_0001), Err(Error::DriverUnavailable(_))));
        assert!(matches!(check(0xE000_0002), Err(Error::NoFreeSlot)));
        assert!(matches!(check(0xE000_0007), Err(Error::TargetNotPlugged)));
        assert!(matches!(check(0xE000_0012), Err(Error::BusAlreadyConnected)));
        assert!(matches!(
            check(0xE000_0016),
            Err(Error::Driver { status: DriverStatus::NotSupported })
        ));
        assert!(matches!(check(0xDEAD_BEEF), Err(Error::UnknownStatus(0xDEAD_BEEF))));
    }

    #[test]
    fn update_failure_keeps_driver_status() {
        let e = Error::TargetNotPlugged.into_update_failure();
        assert!(matches!(e, Error::UpdateFailed { status: DriverStatus::TargetNotPluggedIn }));
        let e = Error::BusNotConnected.into_update_failure();
        assert!(matches!(e, Error::BusNotConnected));
    }
}
