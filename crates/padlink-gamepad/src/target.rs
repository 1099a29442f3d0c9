use crate::notification::{NotificationFn, UserData};
use padlink_bus::{Backend, Bus, Error, Feedback, FeedbackSink, Result, TargetId};
use padlink_protocol::{DriverStatus, TargetType};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Where a target is in its life on the bus. `Detached` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetState {
    Unattached,
    Attaching,
    Attached,
    Detached,
}

/// Outcome of a successful [`VirtualTarget::detach`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Detach {
    Removed,
    AlreadyDetached,
}

/// Plug-in options. Unset ids fall back to the kind's stock hardware ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOptions {
    #[serde(default)]
    pub vendor_id: Option<u16>,
    #[serde(default)]
    pub product_id: Option<u16>,
}

/// Identity of a target as passed to notification callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetHandle {
    pub id: TargetId,
    pub kind: TargetType,
}

impl fmt::Display for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// One emulated controller plugged into a [`Bus`].
///
/// Owns the driver-side allocation: dropping it unregisters any
/// notification callback, unplugs the target and frees it, in that order.
pub struct VirtualTarget {
    bus: Arc<Bus>,
    id: TargetId,
    kind: TargetType,
    vendor_id: u16,
    product_id: u16,
    state: TargetState,
    // Kept alive while registered; the backend's sink only borrows it.
    notification: Option<Arc<NotificationFn>>,
}

impl VirtualTarget {
    /// Allocate a target of `kind`, plug it in and confirm the driver sees it.
    #[instrument(level = "info", skip(bus, options), fields(bus = %bus.id()))]
    pub fn attach(bus: Arc<Bus>, kind: TargetType, options: &TargetOptions) -> Result<Self> {
        bus.ensure_connected()?;
        let id = bus.backend().target_alloc(kind)?;
        let mut target = Self {
            bus,
            id,
            kind,
            vendor_id: options.vendor_id.unwrap_or(kind.default_vendor_id()),
            product_id: options.product_id.unwrap_or(kind.default_product_id()),
            state: TargetState::Unattached,
            notification: None,
        };
        // From here on an early return drops `target`, which frees the allocation.
        target.backend().target_set_ids(id, target.vendor_id, target.product_id)?;

        target.state = TargetState::Attaching;
        target.backend().target_add(id)?;
        if !target.backend().target_is_attached(id) {
            warn!(%id, "driver accepted the target but never reported it attached");
            return Err(Error::AttachFailed { target: id.0 });
        }
        target.state = TargetState::Attached;
        info!(%id, vid = target.vendor_id, pid = target.product_id, "target attached");
        Ok(target)
    }

    fn backend(&self) -> &dyn Backend {
        self.bus.backend()
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn kind(&self) -> TargetType {
        self.kind
    }

    pub fn handle(&self) -> TargetHandle {
        TargetHandle { id: self.id, kind: self.kind }
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.state == TargetState::Attached
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    /// Driver-internal serial number of the plugged target.
    pub fn index(&self) -> Result<u32> {
        self.backend().target_index(self.id)
    }

    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    /// Hand a report to the driver through `submit`. Driver rejections come
    /// back as [`Error::UpdateFailed`].
    pub fn commit_with<F>(&self, submit: F) -> Result<()>
    where
        F: FnOnce(&dyn Backend, TargetId) -> Result<()>,
    {
        if self.state != TargetState::Attached {
            return Err(Error::UpdateFailed { status: DriverStatus::TargetNotPluggedIn });
        }
        submit(self.backend(), self.id).map_err(Error::into_update_failure)
    }

    pub fn register_notification(&mut self, callback: Arc<NotificationFn>) -> Result<()> {
        self.register_notification_with(callback, None)
    }

    /// Register `callback`, replacing any previous one. `user_data` is passed
    /// back on every invocation.
    pub fn register_notification_with(
        &mut self,
        callback: Arc<NotificationFn>,
        user_data: UserData,
    ) -> Result<()> {
        if self.state != TargetState::Attached {
            return Err(Error::NotAttached);
        }
        let bus = self.bus.id();
        let handle = self.handle();
        let invoke = callback.clone();
        let sink: FeedbackSink = Arc::new(move |_: TargetId, fb: Feedback| {
            invoke(bus, handle, fb.large_motor, fb.small_motor, fb.led_number, &user_data)
        });
        if let Err(e) = self.backend().register_notification(self.id, sink) {
            // A failed registration leaves the driver without any callback.
            self.notification = None;
            return Err(e);
        }
        // The previous callback, if any, is released only now that the
        // backend has dropped its registration.
        self.notification = Some(callback);
        debug!(id = %self.id, "notification registered");
        Ok(())
    }

    /// Type-erased registration for callers that hold the callback as
    /// `dyn Any`. Accepts a boxed `Arc<NotificationFn>` or
    /// `Box<NotificationFn>`; anything else is rejected before touching the
    /// driver.
    pub fn register_notification_any(&mut self, callback: Box<dyn Any + Send>) -> Result<()> {
        let callback: Arc<NotificationFn> = match callback.downcast::<Arc<NotificationFn>>() {
            Ok(cb) => *cb,
            Err(other) => match other.downcast::<Box<NotificationFn>>() {
                Ok(cb) => Arc::from(*cb),
                Err(_) => return Err(Error::InvalidCallbackSignature),
            },
        };
        self.register_notification(callback)
    }

    /// Once this returns the callback will not run again.
    pub fn unregister_notification(&mut self) {
        if self.notification.is_none() {
            return;
        }
        self.backend().unregister_notification(self.id);
        self.notification = None;
        debug!(id = %self.id, "notification unregistered");
    }

    pub fn has_notification(&self) -> bool {
        self.notification.is_some()
    }

    /// Unplug the target. Calling it again, or after the driver already
    /// dropped the target, reports [`Detach::AlreadyDetached`].
    #[instrument(level = "debug", skip(self), fields(id = %self.id))]
    pub fn detach(&mut self) -> Result<Detach> {
        if matches!(self.state, TargetState::Unattached | TargetState::Detached) {
            return Ok(Detach::AlreadyDetached);
        }
        self.unregister_notification();
        let removed = self.backend().target_remove(self.id);
        self.state = TargetState::Detached;
        match removed {
            Ok(()) => {
                info!(id = %self.id, "target detached");
                Ok(Detach::Removed)
            }
            Err(Error::TargetNotPlugged) => {
                debug!(id = %self.id, "target was already unplugged");
                Ok(Detach::AlreadyDetached)
            }
            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for VirtualTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualTarget")
            .field("bus", &self.bus.id())
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("notification", &self.notification.is_some())
            .finish()
    }
}

impl Drop for VirtualTarget {
    fn drop(&mut self) {
        if let Err(e) = self.detach() {
            warn!(id = %self.id, error = %e, "detach on drop failed");
        }
        self.backend().target_free(self.id);
    }
}
