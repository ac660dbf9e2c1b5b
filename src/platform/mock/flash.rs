//! Mock flash implementation for testing
//!
//! Word-granular in-memory flash with NOR semantics: erase sets all bits,
//! programming only clears bits. Supports corruption injection for testing
//! the checksum-mismatch path.

use crate::platform::{error::FlashError, traits::FlashInterface, Result};
use std::vec::Vec;

/// Erase unit size (4 KB)
const ERASE_SIZE: u32 = 4096;

/// Flash capacity (1 MB)
const FLASH_CAPACITY: u32 = 1024 * 1024;

/// Protected firmware region (first 256 KB)
const FIRMWARE_SIZE: u32 = 0x40000;

/// Mock flash
///
/// Simulates flash storage in memory for testing:
/// - Word read/program, erase-unit erase
/// - Programming can only change bits from 1 to 0
/// - Bit-flip injection for checksum tests
/// - Erase count tracking
#[derive(Debug)]
pub struct MockFlash {
    /// Word storage, initialized to 0xFFFFFFFF (erased state)
    words: Vec<u32>,
    /// Erase count per erase unit
    erase_counts: Vec<u32>,
}

impl MockFlash {
    /// Create a new mock flash instance, fully erased
    pub fn new() -> Self {
        Self {
            words: vec![0xFFFF_FFFF; (FLASH_CAPACITY / 4) as usize],
            erase_counts: vec![0; (FLASH_CAPACITY / ERASE_SIZE) as usize],
        }
    }

    /// Flip a single bit at the given word address (for corruption tests)
    pub fn flip_bit(&mut self, address: u32, bit: u8) {
        let index = (address / 4) as usize;
        self.words[index] ^= 1 << bit;
    }

    /// Number of times the erase unit containing `address` has been erased
    pub fn erase_count(&self, address: u32) -> u32 {
        self.erase_counts[(address / ERASE_SIZE) as usize]
    }

    fn check_word_address(&self, address: u32) -> Result<()> {
        if address >= FLASH_CAPACITY || address % 4 != 0 {
            return Err(FlashError::InvalidAddress);
        }
        Ok(())
    }
}

impl Default for MockFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashInterface for MockFlash {
    fn read_word(&self, address: u32) -> Result<u32> {
        self.check_word_address(address)?;
        Ok(self.words[(address / 4) as usize])
    }

    fn program_word(&mut self, address: u32, word: u32) -> Result<()> {
        self.check_word_address(address)?;
        if address < FIRMWARE_SIZE {
            return Err(FlashError::InvalidAddress);
        }
        // NOR flash: programming can only clear bits
        self.words[(address / 4) as usize] &= word;
        Ok(())
    }

    fn erase(&mut self, address: u32) -> Result<()> {
        if address >= FLASH_CAPACITY || address % ERASE_SIZE != 0 {
            return Err(FlashError::InvalidAddress);
        }
        if address < FIRMWARE_SIZE {
            return Err(FlashError::InvalidAddress);
        }
        let start = (address / 4) as usize;
        for word in &mut self.words[start..start + (ERASE_SIZE / 4) as usize] {
            *word = 0xFFFF_FFFF;
        }
        self.erase_counts[(address / ERASE_SIZE) as usize] += 1;
        Ok(())
    }

    fn erase_size(&self) -> u32 {
        ERASE_SIZE
    }
}
