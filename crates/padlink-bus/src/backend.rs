pub mod mock;
#[cfg(feature = "backend-vigem")]
pub mod vigem;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use padlink_protocol::abi::Ds4LightbarColor;
use padlink_protocol::{Ds4Report, Ds4ReportEx, TargetType, X360Report};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Backend-assigned identifier of one allocated target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Force-feedback / LED state pushed by the driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Feedback {
    pub large_motor: u8,
    pub small_motor: u8,
    /// Player LED index for 360 targets, 0 for DualShock targets.
    pub led_number: u8,
    /// Lightbar colour for DualShock targets.
    pub lightbar: Option<Ds4LightbarColor>,
}

/// Receives driver notifications. Invoked on a thread the backend owns, so
/// it must return quickly and never block on the caller's side.
pub type FeedbackSink = Arc<dyn Fn(TargetId, Feedback) + Send + Sync>;

/// One call per driver-client operation. Implementations own the raw driver
/// state; the [`Bus`](crate::Bus) and the gamepad layer own lifecycle policy.
pub trait Backend: Send + Sync + 'static {
    fn connect(&self) -> Result<()>;
    /// Destroys every target still plugged in. Allocated targets stay
    /// allocated until [`Backend::target_free`].
    fn disconnect(&self);

    fn target_alloc(&self, kind: TargetType) -> Result<TargetId>;
    /// Only honoured before [`Backend::target_add`].
    fn target_set_ids(&self, target: TargetId, vendor_id: u16, product_id: u16) -> Result<()>;
    /// Blocks until the driver has processed the plug-in request.
    fn target_add(&self, target: TargetId) -> Result<()>;
    fn target_is_attached(&self, target: TargetId) -> bool;
    fn target_remove(&self, target: TargetId) -> Result<()>;
    fn target_free(&self, target: TargetId);
    /// Driver-internal serial of a plugged target.
    fn target_index(&self, target: TargetId) -> Result<u32>;

    fn x360_update(&self, target: TargetId, report: &X360Report) -> Result<()>;
    fn x360_user_index(&self, target: TargetId) -> Result<u32>;
    fn ds4_update(&self, target: TargetId, report: &Ds4Report) -> Result<()>;
    fn ds4_update_ex(&self, target: TargetId, report: &Ds4ReportEx) -> Result<()>;

    /// Replaces any sink already registered for `target`.
    fn register_notification(&self, target: TargetId, sink: FeedbackSink) -> Result<()>;
    /// Must not return while a sink invocation for `target` is still running.
    fn unregister_notification(&self, target: TargetId);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The ViGEmBus driver through its client library.
    #[default]
    Vigem,
    /// In-memory simulation.
    Mock,
}

/// Build the backend selected by configuration.
pub fn open(kind: BackendKind, library: Option<&Path>) -> Result<Arc<dyn Backend>> {
    match kind {
        BackendKind::Mock => Ok(mock::Mock::new()),
        #[cfg(feature = "backend-vigem")]
        BackendKind::Vigem => Ok(vigem::Vigem::load(library)?),
        #[cfg(not(feature = "backend-vigem"))]
        BackendKind::Vigem => {
            let _ = library;
            Err(crate::Error::DriverUnavailable("built without the backend-vigem feature".into()))
        }
    }
}
