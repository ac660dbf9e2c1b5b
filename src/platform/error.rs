//! Platform error types

use core::fmt;

/// Result type for platform operations
pub type Result<T> = core::result::Result<T, FlashError>;

/// Flash-specific errors
///
/// Platform implementations map their HAL-specific errors to these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashError {
    /// Address outside the writable region or misaligned
    InvalidAddress,
    /// Erase operation failed
    EraseFailed,
    /// Word program operation failed
    WriteFailed,
    /// Read operation failed
    ReadFailed,
}

impl fmt::Display for FlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashError::InvalidAddress => write!(f, "invalid flash address"),
            FlashError::EraseFailed => write!(f, "flash erase failed"),
            FlashError::WriteFailed => write!(f, "flash program failed"),
            FlashError::ReadFailed => write!(f, "flash read failed"),
        }
    }
}
