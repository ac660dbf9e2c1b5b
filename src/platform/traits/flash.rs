//! Flash interface trait
//!
//! Word-granular flash primitives used by the persistence layer. The mapping
//! image occupies exactly one erase unit; the caller never erases or programs
//! anything smaller than a word.

use crate::platform::Result;

/// Flash interface trait
///
/// # Flash Characteristics
///
/// - Erase operations work on whole erase units and set all bits to 1
/// - Programming can only change bits from 1 to 0
/// - Erase and program are blocking operations for the whole device
pub trait FlashInterface {
    /// Read one 32-bit word at `address`
    ///
    /// # Errors
    ///
    /// Returns [`crate::platform::FlashError::InvalidAddress`] if `address` is
    /// out of bounds or not word-aligned.
    fn read_word(&self, address: u32) -> Result<u32>;

    /// Program one 32-bit word at `address`
    ///
    /// The target location must have been erased; programming only clears
    /// bits.
    ///
    /// # Errors
    ///
    /// Returns [`crate::platform::FlashError::InvalidAddress`] if `address` is
    /// outside the writable region, or
    /// [`crate::platform::FlashError::WriteFailed`] if the operation fails.
    fn program_word(&mut self, address: u32, word: u32) -> Result<()>;

    /// Erase the erase unit containing `address`
    ///
    /// `address` must be aligned to [`Self::erase_size`]. All bytes in the
    /// unit read 0xFF afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`crate::platform::FlashError::InvalidAddress`] for a
    /// misaligned or protected address, or
    /// [`crate::platform::FlashError::EraseFailed`] if the operation fails.
    fn erase(&mut self, address: u32) -> Result<()>;

    /// Size of one erase unit in bytes (typically 4096)
    fn erase_size(&self) -> u32;
}
