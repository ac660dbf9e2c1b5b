//! Mapping table error codes

use core::fmt;

/// Result codes for mapping table edits
///
/// All of these are local, recoverable conditions: the table is left
/// unchanged and the caller receives a code, never a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// Identifier above the 29-bit extended range
    InvalidId,
    /// Bit offset above 63
    InvalidOffset,
    /// Bit width above 32
    InvalidLength,
    /// The direction's message table is full
    MaxMessages,
    /// The shared binding pool is exhausted
    MaxItems,
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::InvalidId => write!(f, "invalid CAN identifier"),
            MapError::InvalidOffset => write!(f, "invalid bit offset"),
            MapError::InvalidLength => write!(f, "invalid bit width"),
            MapError::MaxMessages => write!(f, "too many messages"),
            MapError::MaxItems => write!(f, "too many items"),
        }
    }
}
