//! Platform abstraction layer
//!
//! Narrow interfaces to the hardware this subsystem consumes: the CAN
//! transceiver (frame transmission and acceptance filters) and the flash
//! primitives used for non-volatile persistence.

pub mod error;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{FlashError, Result};
pub use traits::{CanTransport, FlashInterface};
