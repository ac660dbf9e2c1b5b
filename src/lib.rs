#![cfg_attr(not(any(test, feature = "mock")), no_std)]

//! canmap - CAN message mapping and remote configuration subsystem
//!
//! This library maps CAN frame payload bits onto named device parameters and
//! exposes a CANopen-style SDO protocol for remote configuration over the same
//! bus. The mapping table survives power cycles through a CRC-checked flash
//! image whose parameter references are stable across firmware rebuilds.
//!
//! Hardware access goes through narrow traits in [`platform`]; the parameter
//! store is consumed through [`params::ParamStore`]. Mock implementations for
//! both are available in test builds or behind the `mock` feature.

// Frame fan-out and acceptance filter bookkeeping
pub mod dispatcher;

// Top-level facade wiring mapping, SDO and persistence together
pub mod link;

// Logging macros (defmt / test println / no-op)
pub mod logging;

// The core mapping table and bit codec
pub mod mapping;

// Parameter store collaborator interface
pub mod params;

// Flash image save/load with identity remapping
pub mod persistence;

// Hardware abstraction (CAN transport, flash primitives)
pub mod platform;

// SDO request/reply protocol
pub mod sdo;

pub use link::CanLink;
pub use mapping::{CanMap, Direction, MapError};
