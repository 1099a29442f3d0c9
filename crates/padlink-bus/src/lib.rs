//! Connection to a virtual gamepad bus.
//!
//! A [`Bus`] wraps one [`Backend`] session. It is shared by reference count
//! between every device created on it and disconnects once the last one is
//! gone.

pub mod backend;
mod bus;
mod error;

pub use backend::{Backend, BackendKind, Feedback, FeedbackSink, TargetId};
pub use bus::{Bus, BusId};
pub use error::{Error, Result, check};
