use super::{Backend, Feedback, FeedbackSink, TargetId};
use crate::{Error, Result};
use dashmap::DashMap;
use padlink_protocol::{DriverStatus, Ds4Report, Ds4ReportEx, TargetType, X360Report};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
};
use tracing::{debug, trace};

/// Slots the simulated bus offers unless built with [`Mock::with_slots`].
pub const DEFAULT_SLOTS: usize = 4;

/// Last report a target received, as the driver saw it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Submitted {
    X360(X360Report),
    Ds4(Ds4Report),
    Ds4Ex(Ds4ReportEx),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Plug {
    Allocated,
    Attached,
    Removed,
}

struct MockTarget {
    kind: TargetType,
    vendor_id: u16,
    product_id: u16,
    plug: Plug,
    serial: u32,
    user_index: u32,
    last: Option<Submitted>,
    submissions: u64,
}

/// In-memory stand-in for the bus driver. Behaves like the real client for
/// lifecycle and error reporting, and lets tests inject driver-side events.
pub struct Mock {
    next: AtomicU64,
    next_serial: AtomicU32,
    slots: usize,
    available: bool,
    connected: AtomicBool,
    attach_succeeds: AtomicBool,
    live: DashMap<u64, MockTarget>,
    sinks: DashMap<u64, FeedbackSink>,
}

impl Mock {
    pub fn new() -> Arc<Self> {
        Self::with_slots(DEFAULT_SLOTS)
    }

    pub fn with_slots(slots: usize) -> Arc<Self> {
        Arc::new(Self::build(slots, true))
    }

    /// A bus whose connect fails as if no driver were installed.
    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self::build(DEFAULT_SLOTS, false))
    }

    fn build(slots: usize, available: bool) -> Self {
        Self {
            next: AtomicU64::new(1),
            next_serial: AtomicU32::new(1),
            slots,
            available,
            connected: AtomicBool::new(false),
            attach_succeeds: AtomicBool::new(true),
            live: DashMap::new(),
            sinks: DashMap::new(),
        }
    }

    /// When off, `target_add` succeeds but the target never shows up as attached.
    pub fn set_attach_succeeds(&self, on: bool) {
        self.attach_succeeds.store(on, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Targets currently plugged into the bus.
    pub fn live_targets(&self) -> usize {
        self.live.iter().filter(|t| t.plug == Plug::Attached).count()
    }

    /// Targets allocated and not yet freed, plugged or not.
    pub fn allocated_targets(&self) -> usize {
        self.live.len()
    }

    pub fn last_report(&self, target: TargetId) -> Option<Submitted> {
        self.live.get(&target.0).and_then(|t| t.last)
    }

    pub fn submissions(&self, target: TargetId) -> u64 {
        self.live.get(&target.0).map_or(0, |t| t.submissions)
    }

    pub fn ids(&self, target: TargetId) -> Option<(u16, u16)> {
        self.live.get(&target.0).map(|t| (t.vendor_id, t.product_id))
    }

    pub fn has_sink(&self, target: TargetId) -> bool {
        self.sinks.contains_key(&target.0)
    }

    /// Deliver a notification the way the driver would: on the calling
    /// thread, to whatever sink is registered. Returns whether one was.
    pub fn notify(&self, target: TargetId, feedback: Feedback) -> bool {
        // The shard guard stays held for the call so that a concurrent
        // unregister waits for this invocation to finish.
        match self.sinks.get(&target.0) {
            Some(sink) => {
                trace!(%target, ?feedback, "mock notification");
                (sink.value())(target, feedback);
                true
            }
            None => false,
        }
    }

    /// Simulate a surprise removal, e.g. the device being yanked by the OS.
    pub fn unplug_externally(&self, target: TargetId) {
        self.sinks.remove(&target.0);
        if let Some(mut t) = self.live.get_mut(&target.0) {
            t.plug = Plug::Removed;
        }
        debug!(%target, "mock target unplugged externally");
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DriverStatus::BusInvalidHandle.into())
        }
    }

    fn submit(&self, target: TargetId, kind: TargetType, report: Submitted) -> Result<()> {
        self.ensure_connected()?;
        let mut t = self.live.get_mut(&target.0).ok_or(Error::from(DriverStatus::InvalidTarget))?;
        if t.kind != kind {
            return Err(DriverStatus::InvalidTarget.into());
        }
        if t.plug != Plug::Attached {
            return Err(DriverStatus::TargetNotPluggedIn.into());
        }
        t.last = Some(report);
        t.submissions += 1;
        Ok(())
    }
}

impl Backend for Mock {
    fn connect(&self) -> Result<()> {
        if !self.available {
            return Err(DriverStatus::BusNotFound.into());
        }
        if self.connected.swap(true, Ordering::SeqCst) {
            return Err(DriverStatus::BusAlreadyConnected.into());
        }
        debug!(slots = self.slots, "mock bus connected");
        Ok(())
    }

    fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        self.sinks.clear();
        for mut t in self.live.iter_mut() {
            if t.plug == Plug::Attached {
                t.plug = Plug::Removed;
            }
        }
        debug!("mock bus disconnected");
    }

    fn target_alloc(&self, kind: TargetType) -> Result<TargetId> {
        let h = self.next.fetch_add(1, Ordering::SeqCst);
        self.live.insert(
            h,
            MockTarget {
                kind,
                vendor_id: kind.default_vendor_id(),
                product_id: kind.default_product_id(),
                plug: Plug::Allocated,
                serial: 0,
                user_index: 0,
                last: None,
                submissions: 0,
            },
        );
        Ok(TargetId(h))
    }

    fn target_set_ids(&self, target: TargetId, vendor_id: u16, product_id: u16) -> Result<()> {
        let mut t = self.live.get_mut(&target.0).ok_or(Error::from(DriverStatus::InvalidTarget))?;
        if t.plug == Plug::Allocated {
            t.vendor_id = vendor_id;
            t.product_id = product_id;
        }
        Ok(())
    }

    fn target_add(&self, target: TargetId) -> Result<()> {
        self.ensure_connected()?;
        // Count before taking the entry lock; iterating while holding a
        // write guard on the same shard would deadlock.
        let plugged = self.live_targets();
        let x360_plugged = self
            .live
            .iter()
            .filter(|t| t.plug == Plug::Attached && t.kind == TargetType::Xbox360Wired)
            .count() as u32;

        let mut t = self.live.get_mut(&target.0).ok_or(Error::from(DriverStatus::InvalidTarget))?;
        if t.plug == Plug::Attached {
            return Err(DriverStatus::AlreadyConnected.into());
        }
        if plugged >= self.slots {
            return Err(DriverStatus::NoFreeSlot.into());
        }
        if self.attach_succeeds.load(Ordering::SeqCst) {
            t.plug = Plug::Attached;
            t.serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
            t.user_index = x360_plugged;
        }
        debug!(%target, kind = %t.kind, serial = t.serial, "mock target added");
        Ok(())
    }

    fn target_is_attached(&self, target: TargetId) -> bool {
        self.live.get(&target.0).is_some_and(|t| t.plug == Plug::Attached)
    }

    fn target_remove(&self, target: TargetId) -> Result<()> {
        self.sinks.remove(&target.0);
        let mut t = self.live.get_mut(&target.0).ok_or(Error::from(DriverStatus::InvalidTarget))?;
        if t.plug != Plug::Attached {
            return Err(DriverStatus::TargetNotPluggedIn.into());
        }
        t.plug = Plug::Removed;
        Ok(())
    }

    fn target_free(&self, target: TargetId) {
        self.sinks.remove(&target.0);
        self.live.remove(&target.0);
    }

    fn target_index(&self, target: TargetId) -> Result<u32> {
        match self.live.get(&target.0) {
            Some(t) if t.plug == Plug::Attached => Ok(t.serial),
            Some(_) => Err(DriverStatus::TargetNotPluggedIn.into()),
            None => Err(DriverStatus::InvalidTarget.into()),
        }
    }

    fn x360_update(&self, target: TargetId, report: &X360Report) -> Result<()> {
        trace!(%target, ?report, "mock x360 update");
        self.submit(target, TargetType::Xbox360Wired, Submitted::X360(*report))
    }

    fn x360_user_index(&self, target: TargetId) -> Result<u32> {
        match self.live.get(&target.0) {
            Some(t) if t.kind != TargetType::Xbox360Wired => {
                Err(DriverStatus::InvalidTarget.into())
            }
            Some(t) if t.plug == Plug::Attached => Ok(t.user_index),
            Some(_) => Err(DriverStatus::TargetNotPluggedIn.into()),
            None => Err(DriverStatus::InvalidTarget.into()),
        }
    }

    fn ds4_update(&self, target: TargetId, report: &Ds4Report) -> Result<()> {
        trace!(%target, ?report, "mock ds4 update");
        self.submit(target, TargetType::DualShock4Wired, Submitted::Ds4(*report))
    }

    fn ds4_update_ex(&self, target: TargetId, report: &Ds4ReportEx) -> Result<()> {
        self.submit(target, TargetType::DualShock4Wired, Submitted::Ds4Ex(*report))
    }

    fn register_notification(&self, target: TargetId, sink: FeedbackSink) -> Result<()> {
        if !self.target_is_attached(target) {
            return Err(DriverStatus::TargetNotPluggedIn.into());
        }
        self.sinks.insert(target.0, sink);
        Ok(())
    }

    fn unregister_notification(&self, target: TargetId) {
        self.sinks.remove(&target.0);
    }
}
