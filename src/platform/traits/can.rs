//! CAN transport trait
//!
//! The bus transceiver is an external collaborator: it delivers received
//! frames to the dispatcher and accepts frames for transmission. Frames carry
//! an identifier of up to 29 bits and 8 payload bytes treated as two
//! native-endian 32-bit words; bit 0 is the least significant bit of the low
//! word.

/// CAN transport interface
///
/// Platform implementations provide frame transmission and acceptance filter
/// programming. Reception is push-based: the platform's receive interrupt
/// forwards frames to [`crate::link::CanLink::handle_frame`].
pub trait CanTransport {
    /// Transmit a frame
    fn send(&mut self, can_id: u32, data: [u32; 2]);

    /// Reprogram the acceptance filters to pass exactly the given identifiers
    ///
    /// Called whenever the dispatcher's identifier-of-interest list changes.
    fn set_filters(&mut self, ids: &[u32]);
}
