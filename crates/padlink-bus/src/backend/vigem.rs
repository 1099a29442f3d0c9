//! ViGEmBus through its user-mode client library, resolved at runtime.

use super::{Backend, Feedback, FeedbackSink, TargetId};
use crate::error::check;
use crate::{Error, Result};
use dashmap::DashMap;
use libloading::Library;
use padlink_protocol::abi::{Ds4LightbarColor, Ds4ReportExRaw, Ds4ReportRaw, XusbReportRaw};
use padlink_protocol::{DriverStatus, Ds4Report, Ds4ReportEx, TargetType, X360Report};
use std::ffi::{OsStr, c_void};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tracing::{debug, error, info, warn};

pub const DEFAULT_LIBRARY: &str = "ViGEmClient.dll";

type PClient = *mut c_void;
type PTarget = *mut c_void;

type X360NotificationFn =
    unsafe extern "system" fn(PClient, PTarget, u8, u8, u8, *mut c_void);
type Ds4NotificationFn =
    unsafe extern "system" fn(PClient, PTarget, u8, u8, Ds4LightbarColor, *mut c_void);

struct Api {
    alloc: unsafe extern "C" fn() -> PClient,
    free: unsafe extern "C" fn(PClient),
    connect: unsafe extern "C" fn(PClient) -> u32,
    disconnect: unsafe extern "C" fn(PClient),
    target_x360_alloc: unsafe extern "C" fn() -> PTarget,
    target_ds4_alloc: unsafe extern "C" fn() -> PTarget,
    target_free: unsafe extern "C" fn(PTarget),
    target_add: unsafe extern "C" fn(PClient, PTarget) -> u32,
    target_remove: unsafe extern "C" fn(PClient, PTarget) -> u32,
    target_set_vid: unsafe extern "C" fn(PTarget, u16),
    target_set_pid: unsafe extern "C" fn(PTarget, u16),
    target_get_index: unsafe extern "C" fn(PTarget) -> u32,
    target_is_attached: unsafe extern "C" fn(PTarget) -> i32,
    x360_update: unsafe extern "C" fn(PClient, PTarget, XusbReportRaw) -> u32,
    x360_get_user_index: unsafe extern "C" fn(PClient, PTarget, *mut u32) -> u32,
    x360_register_notification:
        unsafe extern "C" fn(PClient, PTarget, X360NotificationFn, *mut c_void) -> u32,
    x360_unregister_notification: unsafe extern "C" fn(PTarget),
    ds4_update: unsafe extern "C" fn(PClient, PTarget, Ds4ReportRaw) -> u32,
    // Absent from older client builds.
    ds4_update_ex: Option<unsafe extern "C" fn(PClient, PTarget, Ds4ReportExRaw) -> u32>,
    ds4_register_notification:
        unsafe extern "C" fn(PClient, PTarget, Ds4NotificationFn, *mut c_void) -> u32,
    ds4_unregister_notification: unsafe extern "C" fn(PTarget),
}

/// # Safety
/// `T` must be the exact function pointer type of the exported symbol.
unsafe fn symbol<T: Copy>(library: &Library, name: &'static [u8]) -> Result<T> {
    let found = unsafe { library.get::<T>(name) }.map_err(|e| {
        let printable = String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name));
        Error::DriverUnavailable(format!("{printable} not exported: {e}"))
    })?;
    Ok(*found)
}

impl Api {
    /// # Safety
    /// `library` must be a ViGEmClient build exporting the documented C API.
    unsafe fn resolve(library: &Library) -> Result<Self> {
        unsafe {
            Ok(Self {
                alloc: symbol(library, b"vigem_alloc\0")?,
                free: symbol(library, b"vigem_free\0")?,
                connect: symbol(library, b"vigem_connect\0")?,
                disconnect: symbol(library, b"vigem_disconnect\0")?,
                target_x360_alloc: symbol(library, b"vigem_target_x360_alloc\0")?,
                target_ds4_alloc: symbol(library, b"vigem_target_ds4_alloc\0")?,
                target_free: symbol(library, b"vigem_target_free\0")?,
                target_add: symbol(library, b"vigem_target_add\0")?,
                target_remove: symbol(library, b"vigem_target_remove\0")?,
                target_set_vid: symbol(library, b"vigem_target_set_vid\0")?,
                target_set_pid: symbol(library, b"vigem_target_set_pid\0")?,
                target_get_index: symbol(library, b"vigem_target_get_index\0")?,
                target_is_attached: symbol(library, b"vigem_target_is_attached\0")?,
                x360_update: symbol(library, b"vigem_target_x360_update\0")?,
                x360_get_user_index: symbol(library, b"vigem_target_x360_get_user_index\0")?,
                x360_register_notification: symbol(
                    library,
                    b"vigem_target_x360_register_notification\0",
                )?,
                x360_unregister_notification: symbol(
                    library,
                    b"vigem_target_x360_unregister_notification\0",
                )?,
                ds4_update: symbol(library, b"vigem_target_ds4_update\0")?,
                ds4_update_ex: symbol(library, b"vigem_target_ds4_update_ex\0").ok(),
                ds4_register_notification: symbol(
                    library,
                    b"vigem_target_ds4_register_notification\0",
                )?,
                ds4_unregister_notification: symbol(
                    library,
                    b"vigem_target_ds4_unregister_notification\0",
                )?,
            })
        }
    }
}

#[derive(Clone, Copy)]
struct Raw(*mut c_void);

// SAFETY: the client library synchronises access to client and target
// objects internally; we only ever pass these pointers back to it.
unsafe impl Send for Raw {}
unsafe impl Sync for Raw {}

/// Heap slot whose address is the driver's `UserData`. It must stay put
/// until the matching unregister call has returned.
struct SinkSlot {
    target: TargetId,
    sink: FeedbackSink,
}

struct LiveTarget {
    ptr: Raw,
    kind: TargetType,
    slot: Option<Box<SinkSlot>>,
}

pub struct Vigem {
    api: Api,
    client: Raw,
    next: AtomicU64,
    live: DashMap<u64, LiveTarget>,
    // Declared last: the function pointers in `api` die with it.
    _library: Library,
}

impl Vigem {
    pub fn load(path: Option<&Path>) -> Result<Arc<Self>> {
        let path = path.map(Path::as_os_str).unwrap_or_else(|| OsStr::new(DEFAULT_LIBRARY));
        // SAFETY: the client library has no initialisation preconditions.
        let library = unsafe { Library::new(path) }.map_err(|e| {
            Error::DriverUnavailable(format!("cannot load {}: {e}", path.to_string_lossy()))
        })?;
        // SAFETY: symbol types mirror ViGEmClient.h.
        let api = unsafe { Api::resolve(&library)? };
        let client = unsafe { (api.alloc)() };
        if client.is_null() {
            return Err(Error::DriverUnavailable("vigem_alloc returned null".into()));
        }
        let ex_reports = api.ds4_update_ex.is_some();
        info!(library = %path.to_string_lossy(), ex_reports, "ViGEm client loaded");
        Ok(Arc::new(Self {
            api,
            client: Raw(client),
            next: AtomicU64::new(1),
            live: DashMap::new(),
            _library: library,
        }))
    }

    fn lookup(&self, target: TargetId) -> Result<(Raw, TargetType)> {
        self.live
            .get(&target.0)
            .map(|t| (t.ptr, t.kind))
            .ok_or(Error::from(DriverStatus::InvalidTarget))
    }

    /// # Safety
    /// `ptr` must be a live target allocated by this client.
    unsafe fn unregister_raw(&self, ptr: Raw, kind: TargetType) {
        unsafe {
            match kind {
                TargetType::Xbox360Wired => (self.api.x360_unregister_notification)(ptr.0),
                TargetType::DualShock4Wired => (self.api.ds4_unregister_notification)(ptr.0),
            }
        }
    }
}

unsafe fn dispatch(user_data: *mut c_void, feedback: Feedback) {
    if user_data.is_null() {
        return;
    }
    // SAFETY: `user_data` is the address of a `SinkSlot` owned by the live
    // table until the driver's unregister call has returned.
    let slot = unsafe { &*(user_data as *const SinkSlot) };
    if catch_unwind(AssertUnwindSafe(|| (slot.sink)(slot.target, feedback))).is_err() {
        error!(id = %slot.target, "notification sink panicked");
    }
}

unsafe extern "system" fn x360_trampoline(
    _client: PClient,
    _target: PTarget,
    large_motor: u8,
    small_motor: u8,
    led_number: u8,
    user_data: *mut c_void,
) {
    let feedback = Feedback { large_motor, small_motor, led_number, lightbar: None };
    unsafe { dispatch(user_data, feedback) }
}

unsafe extern "system" fn ds4_trampoline(
    _client: PClient,
    _target: PTarget,
    large_motor: u8,
    small_motor: u8,
    lightbar: Ds4LightbarColor,
    user_data: *mut c_void,
) {
    let feedback = Feedback { large_motor, small_motor, led_number: 0, lightbar: Some(lightbar) };
    unsafe { dispatch(user_data, feedback) }
}

impl Backend for Vigem {
    fn connect(&self) -> Result<()> {
        check(unsafe { (self.api.connect)(self.client.0) })?;
        info!("connected to ViGEmBus");
        Ok(())
    }

    fn disconnect(&self) {
        unsafe { (self.api.disconnect)(self.client.0) };
        info!("disconnected from ViGEmBus");
    }

    fn target_alloc(&self, kind: TargetType) -> Result<TargetId> {
        let ptr = unsafe {
            match kind {
                TargetType::Xbox360Wired => (self.api.target_x360_alloc)(),
                TargetType::DualShock4Wired => (self.api.target_ds4_alloc)(),
            }
        };
        if ptr.is_null() {
            return Err(DriverStatus::TargetUninitialized.into());
        }
        let h = self.next.fetch_add(1, Ordering::SeqCst);
        self.live.insert(h, LiveTarget { ptr: Raw(ptr), kind, slot: None });
        debug!(id = h, %kind, "target allocated");
        Ok(TargetId(h))
    }

    fn target_set_ids(&self, target: TargetId, vendor_id: u16, product_id: u16) -> Result<()> {
        let (ptr, _) = self.lookup(target)?;
        unsafe {
            (self.api.target_set_vid)(ptr.0, vendor_id);
            (self.api.target_set_pid)(ptr.0, product_id);
        }
        Ok(())
    }

    fn target_add(&self, target: TargetId) -> Result<()> {
        let (ptr, _) = self.lookup(target)?;
        check(unsafe { (self.api.target_add)(self.client.0, ptr.0) })
    }

    fn target_is_attached(&self, target: TargetId) -> bool {
        match self.lookup(target) {
            Ok((ptr, _)) => unsafe { (self.api.target_is_attached)(ptr.0) != 0 },
            Err(_) => false,
        }
    }

    fn target_remove(&self, target: TargetId) -> Result<()> {
        let (ptr, _) = self.lookup(target)?;
        check(unsafe { (self.api.target_remove)(self.client.0, ptr.0) })
    }

    fn target_free(&self, target: TargetId) {
        let Some((_, t)) = self.live.remove(&target.0) else {
            return;
        };
        unsafe {
            if t.slot.is_some() {
                self.unregister_raw(t.ptr, t.kind);
            }
            (self.api.target_free)(t.ptr.0);
        }
        debug!(id = %target, "target freed");
    }

    fn target_index(&self, target: TargetId) -> Result<u32> {
        let (ptr, _) = self.lookup(target)?;
        Ok(unsafe { (self.api.target_get_index)(ptr.0) })
    }

    fn x360_update(&self, target: TargetId, report: &X360Report) -> Result<()> {
        let (ptr, _) = self.lookup(target)?;
        let raw = XusbReportRaw::from(report);
        check(unsafe { (self.api.x360_update)(self.client.0, ptr.0, raw) })
    }

    fn x360_user_index(&self, target: TargetId) -> Result<u32> {
        let (ptr, _) = self.lookup(target)?;
        let mut index = 0u32;
        check(unsafe { (self.api.x360_get_user_index)(self.client.0, ptr.0, &mut index) })?;
        Ok(index)
    }

    fn ds4_update(&self, target: TargetId, report: &Ds4Report) -> Result<()> {
        let (ptr, _) = self.lookup(target)?;
        let raw = Ds4ReportRaw::from(report);
        check(unsafe { (self.api.ds4_update)(self.client.0, ptr.0, raw) })
    }

    fn ds4_update_ex(&self, target: TargetId, report: &Ds4ReportEx) -> Result<()> {
        let Some(update_ex) = self.api.ds4_update_ex else {
            return Err(DriverStatus::NotSupported.into());
        };
        let (ptr, _) = self.lookup(target)?;
        let raw = Ds4ReportExRaw::from(report);
        check(unsafe { update_ex(self.client.0, ptr.0, raw) })
    }

    fn register_notification(&self, target: TargetId, sink: FeedbackSink) -> Result<()> {
        let mut entry =
            self.live.get_mut(&target.0).ok_or(Error::from(DriverStatus::InvalidTarget))?;
        let (ptr, kind) = (entry.ptr, entry.kind);
        if entry.slot.is_some() {
            unsafe { self.unregister_raw(ptr, kind) };
            entry.slot = None;
        }

        let slot = Box::new(SinkSlot { target, sink });
        let user_data = &*slot as *const SinkSlot as *mut c_void;
        let code = unsafe {
            match kind {
                TargetType::Xbox360Wired => (self.api.x360_register_notification)(
                    self.client.0,
                    ptr.0,
                    x360_trampoline,
                    user_data,
                ),
                TargetType::DualShock4Wired => (self.api.ds4_register_notification)(
                    self.client.0,
                    ptr.0,
                    ds4_trampoline,
                    user_data,
                ),
            }
        };
        check(code)?;
        entry.slot = Some(slot);
        debug!(id = %target, "notification registered");
        Ok(())
    }

    fn unregister_notification(&self, target: TargetId) {
        let Some(mut entry) = self.live.get_mut(&target.0) else {
            return;
        };
        if entry.slot.is_none() {
            return;
        }
        unsafe { self.unregister_raw(entry.ptr, entry.kind) };
        // Only now is the driver guaranteed to be done with the slot.
        entry.slot = None;
        debug!(id = %target, "notification unregistered");
    }
}

impl Drop for Vigem {
    fn drop(&mut self) {
        let leftover: Vec<u64> = self.live.iter().map(|t| *t.key()).collect();
        if !leftover.is_empty() {
            warn!(count = leftover.len(), "freeing targets still allocated at shutdown");
        }
        for id in leftover {
            self.target_free(TargetId(id));
        }
        unsafe { (self.api.free)(self.client.0) };
    }
}
