//! Mock CAN transport for testing
//!
//! Captures transmitted frames and acceptance filter reconfigurations so
//! tests can assert on bus-side behavior.

use crate::platform::traits::CanTransport;
use std::vec::Vec;

/// Mock CAN bus
///
/// Records every transmitted frame and every acceptance filter
/// reconfiguration in order.
#[derive(Debug, Default)]
pub struct MockCanBus {
    sent: Vec<(u32, [u32; 2])>,
    filters: Vec<u32>,
    filter_configs: u32,
}

impl MockCanBus {
    /// Create a new mock bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames transmitted so far, in order
    pub fn sent(&self) -> &[(u32, [u32; 2])] {
        &self.sent
    }

    /// The most recently transmitted frame
    pub fn last_sent(&self) -> Option<&(u32, [u32; 2])> {
        self.sent.last()
    }

    /// Identifiers passed to the last filter reconfiguration
    pub fn filters(&self) -> &[u32] {
        &self.filters
    }

    /// Number of filter reconfigurations performed
    pub fn filter_configs(&self) -> u32 {
        self.filter_configs
    }

    /// Drop captured frames
    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }
}

impl CanTransport for MockCanBus {
    fn send(&mut self, can_id: u32, data: [u32; 2]) {
        self.sent.push((can_id, data));
    }

    fn set_filters(&mut self, ids: &[u32]) {
        self.filters.clear();
        self.filters.extend_from_slice(ids);
        self.filter_configs += 1;
    }
}
