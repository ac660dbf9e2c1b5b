//! Parameter store collaborator interface
//!
//! The parameter store itself lives outside this subsystem; the mapping
//! engine reaches it through [`ParamStore`]. Parameters are addressed by a
//! dense enumeration index at runtime and carry a persistent identifier that
//! stays stable across firmware rebuilds, which is what the flash image
//! stores.
//!
//! Fixed-point parameters use the firmware-wide Q27.5 representation
//! (value scaled by 32).

use core::fmt;

#[cfg(any(test, feature = "mock"))]
mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockParamStore, ParamDef};

/// Number of fractional bits in the fixed-point representation
pub const FRAC_BITS: u32 = 5;

/// Convert a float to the Q27.5 fixed-point representation
pub fn to_fixed(value: f32) -> i32 {
    (value * (1 << FRAC_BITS) as f32) as i32
}

/// Convert a Q27.5 fixed-point value to float
pub fn from_fixed(raw: i32) -> f32 {
    raw as f32 / (1 << FRAC_BITS) as f32
}

/// How a parameter's value is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Configurable parameter held in fixed-point, validated on write
    FixedPoint,
    /// Spot value held as float, written without validation
    Float,
}

/// Parameter store error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamError {
    /// No parameter with the given index or persistent identifier
    NotFound,
    /// Value rejected by the parameter's range limits
    ValueOutOfRange,
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::NotFound => write!(f, "parameter not found"),
            ParamError::ValueOutOfRange => write!(f, "value out of range"),
        }
    }
}

/// Keyed value store addressed by a dense parameter enumeration
///
/// Indices are `0..count()`. Each parameter declares a [`ParamKind`] that
/// decides which write path the receive codec uses, and a persistent
/// identifier used by the flash image and by remote tools built against a
/// different firmware build.
pub trait ParamStore {
    /// Number of parameters in the enumeration
    fn count(&self) -> usize;

    /// Storage kind of the parameter at `index`
    fn kind(&self, index: usize) -> ParamKind;

    /// Read the parameter as float
    fn get_float(&self, index: usize) -> f32;

    /// Write a spot value as float, without validation
    fn set_float(&mut self, index: usize, value: f32);

    /// Write a fixed-point value, validated against the parameter's limits
    fn set_fixed(&mut self, index: usize, raw: i32) -> Result<(), ParamError>;

    /// Raw stored representation, as exposed to remote configuration reads
    fn get_raw(&self, index: usize) -> u32;

    /// Write the raw stored representation, validated (remote configuration)
    fn set_raw(&mut self, index: usize, raw: u32) -> Result<(), ParamError>;

    /// Persistent identifier of the parameter at `index`
    fn unique_id(&self, index: usize) -> u16;

    /// Resolve a persistent identifier back to the enumeration index
    fn index_from_unique_id(&self, unique_id: u16) -> Option<usize>;
}
