use crate::backend::{self, Backend, BackendKind};
use crate::{Error, Result};
use std::fmt;
use std::path::Path;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use tracing::{info, instrument, warn};

static NEXT_BUS: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a bus connection, handed to notification
/// callbacks in place of the driver's client pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BusId(u64);

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus#{}", self.0)
    }
}

pub struct Bus {
    id: BusId,
    backend: Arc<dyn Backend>,
    connected: AtomicBool,
}

impl Bus {
    /// Wrap a backend without connecting it.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            id: BusId(NEXT_BUS.fetch_add(1, Ordering::Relaxed)),
            backend,
            connected: AtomicBool::new(false),
        }
    }

    /// Wrap and connect in one step; the usual entry point.
    pub fn open(backend: Arc<dyn Backend>) -> Result<Arc<Self>> {
        let bus = Self::new(backend);
        bus.connect()?;
        Ok(Arc::new(bus))
    }

    /// Open the backend named by configuration and connect to it.
    pub fn open_kind(kind: BackendKind, library: Option<&Path>) -> Result<Arc<Self>> {
        Self::open(backend::open(kind, library)?)
    }

    #[instrument(level = "debug", skip(self), fields(bus = %self.id))]
    pub fn connect(&self) -> Result<()> {
        if self.connected.swap(true, Ordering::SeqCst) {
            return Err(Error::BusAlreadyConnected);
        }
        if let Err(e) = self.backend.connect() {
            self.connected.store(false, Ordering::SeqCst);
            return Err(e);
        }
        info!(bus = %self.id, "bus connected");
        Ok(())
    }

    /// Safe to call more than once.
    pub fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.backend.disconnect();
            info!(bus = %self.id, "bus disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn backend(&self) -> &dyn Backend {
        &*self.backend
    }

    /// Fails with [`Error::BusNotConnected`] unless connected.
    pub fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() { Ok(()) } else { Err(Error::BusNotConnected) }
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Drop for Bus {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!(bus = %self.id, "bus dropped while connected, disconnecting");
            self.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::Mock;

    #[test]
    fn open_connects_once() {
        let mock = Mock::new();
        let bus = Bus::open(mock.clone()).unwrap();
        assert!(bus.is_connected());
        assert!(mock.is_connected());
        assert!(matches!(bus.connect(), Err(Error::BusAlreadyConnected)));
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mock = Mock::new();
        let bus = Bus::open(mock.clone()).unwrap();
        bus.disconnect();
        bus.disconnect();
        assert!(!bus.is_connected());
        assert!(!mock.is_connected());
        assert!(matches!(bus.ensure_connected(), Err(Error::BusNotConnected)));
    }

    #[test]
    fn unavailable_driver_leaves_bus_disconnected() {
        let bus = Bus::new(Mock::unavailable());
        assert!(matches!(bus.connect(), Err(Error::DriverUnavailable(_))));
        assert!(!bus.is_connected());
    }

    #[test]
    fn drop_disconnects_backend() {
        let mock = Mock::new();
        drop(Bus::open(mock.clone()).unwrap());
        assert!(!mock.is_connected());
    }

    #[test]
    fn ids_are_unique() {
        let a = Bus::new(Mock::new());
        let b = Bus::new(Mock::new());
        assert_ne!(a.id(), b.id());
    }
}
