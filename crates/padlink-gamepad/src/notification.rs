use crate::target::TargetHandle;
use padlink_bus::BusId;
use std::any::Any;
use std::sync::Arc;

/// Opaque value handed back to a notification callback on every call.
pub type UserData = Option<Arc<dyn Any + Send + Sync>>;

/// Force-feedback callback: `(bus, target, large_motor, small_motor, led_number, user_data)`.
///
/// Runs on a driver-owned thread. It must not block; push the values onto a
/// channel or similar and return.
pub type NotificationFn = dyn Fn(BusId, TargetHandle, u8, u8, u8, &UserData) + Send + Sync;
