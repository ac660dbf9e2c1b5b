//! Mock platform implementations for testing
//!
//! In-memory stand-ins for the CAN transceiver and flash, available during
//! test builds or behind the `mock` feature.

#![cfg(any(test, feature = "mock"))]

mod can;
mod flash;

pub use can::MockCanBus;
pub use flash::MockFlash;
