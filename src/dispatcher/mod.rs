//! Frame dispatcher
//!
//! Fan-out of received frames to a bounded set of registered consumers, and
//! ownership of the identifier-of-interest list that drives the transport's
//! acceptance filters. Consumers are invoked in registration order; the
//! first one to claim a frame stops the fan-out, and unclaimed frames are
//! silently dropped.

use crate::log_debug;
use crate::platform::traits::CanTransport;
use heapless::Vec;

/// Maximum identifiers on the acceptance list
pub const MAX_USER_MESSAGES: usize = 30;

/// Maximum registered consumers
pub const MAX_CONSUMERS: usize = 2;

/// A registered frame consumer
///
/// `rx` returns true when the frame was handled; `clear` is invoked after
/// the acceptance list was dropped so the consumer can re-register its
/// identifiers of interest.
#[derive(Clone, Copy)]
pub struct FrameConsumer {
    /// Receive hook
    pub rx: fn(can_id: u32, data: &[u32; 2]) -> bool,
    /// Acceptance-list-cleared notification
    pub clear: fn(),
}

/// Frame dispatcher owning the transport and the acceptance list
pub struct FrameDispatcher<T: CanTransport> {
    transport: T,
    user_ids: Vec<u32, MAX_USER_MESSAGES>,
    consumers: Vec<FrameConsumer, MAX_CONSUMERS>,
}

impl<T: CanTransport> FrameDispatcher<T> {
    /// Create a dispatcher with an empty acceptance list
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            user_ids: Vec::new(),
            consumers: Vec::new(),
        }
    }

    /// Register a consumer; false once the consumer table is full
    pub fn register(&mut self, consumer: FrameConsumer) -> bool {
        self.consumers.push(consumer).is_ok()
    }

    /// Add an identifier of interest
    ///
    /// Returns false if the identifier is already present or the list is
    /// full. On success the transport's acceptance filters are reprogrammed.
    pub fn register_user_message(&mut self, can_id: u32) -> bool {
        if self.user_ids.contains(&can_id) {
            return false;
        }
        if self.user_ids.push(can_id).is_err() {
            return false;
        }
        log_debug!("acceptance filter add id={}", can_id);
        self.transport.set_filters(&self.user_ids);
        true
    }

    /// Drop every identifier of interest
    ///
    /// Reprograms the filters and notifies each registered consumer so it
    /// can re-register its own identifiers.
    pub fn clear_user_messages(&mut self) {
        self.user_ids.clear();
        self.transport.set_filters(&self.user_ids);
        for consumer in &self.consumers {
            (consumer.clear)();
        }
    }

    /// Fan a received frame out to the registered consumers
    ///
    /// Returns true if some consumer claimed the frame; an unclaimed frame
    /// is dropped without error.
    pub fn dispatch(&mut self, can_id: u32, data: &[u32; 2]) -> bool {
        for consumer in &self.consumers {
            if (consumer.rx)(can_id, data) {
                return true;
            }
        }
        false
    }

    /// Transmit a frame
    pub fn send(&mut self, can_id: u32, data: [u32; 2]) {
        self.transport.send(can_id, data);
    }

    /// Current identifiers of interest
    pub fn user_ids(&self) -> &[u32] {
        &self.user_ids
    }

    /// Access the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockCanBus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static FIRST_RX: AtomicUsize = AtomicUsize::new(0);
    static SECOND_RX: AtomicUsize = AtomicUsize::new(0);
    static CLEARS: AtomicUsize = AtomicUsize::new(0);

    fn first_rx(can_id: u32, _data: &[u32; 2]) -> bool {
        FIRST_RX.fetch_add(1, Ordering::SeqCst);
        can_id == 0x100
    }

    fn second_rx(_can_id: u32, _data: &[u32; 2]) -> bool {
        SECOND_RX.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn count_clear() {
        CLEARS.fetch_add(1, Ordering::SeqCst);
    }

    fn consumer(rx: fn(u32, &[u32; 2]) -> bool) -> FrameConsumer {
        FrameConsumer {
            rx,
            clear: count_clear,
        }
    }

    #[test]
    fn test_dispatch_stops_at_first_claim() {
        FIRST_RX.store(0, Ordering::SeqCst);
        SECOND_RX.store(0, Ordering::SeqCst);
        let mut dispatcher = FrameDispatcher::new(MockCanBus::new());
        assert!(dispatcher.register(consumer(first_rx)));
        assert!(dispatcher.register(consumer(second_rx)));

        // Claimed by the first consumer; the second never runs
        assert!(dispatcher.dispatch(0x100, &[0, 0]));
        assert_eq!(FIRST_RX.load(Ordering::SeqCst), 1);
        assert_eq!(SECOND_RX.load(Ordering::SeqCst), 0);

        // Declined by the first, claimed by the second
        assert!(dispatcher.dispatch(0x200, &[0, 0]));
        assert_eq!(SECOND_RX.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unclaimed_frame_is_dropped() {
        let mut dispatcher = FrameDispatcher::new(MockCanBus::new());
        assert!(dispatcher.register(consumer(first_rx)));
        assert!(!dispatcher.dispatch(0x300, &[0, 0]));
    }

    #[test]
    fn test_register_consumer_capacity() {
        let mut dispatcher = FrameDispatcher::new(MockCanBus::new());
        for _ in 0..MAX_CONSUMERS {
            assert!(dispatcher.register(consumer(first_rx)));
        }
        assert!(!dispatcher.register(consumer(first_rx)));
    }

    #[test]
    fn test_register_user_message() {
        let mut dispatcher = FrameDispatcher::new(MockCanBus::new());

        assert!(dispatcher.register_user_message(0x201));
        // Duplicates are rejected without touching the filters
        assert!(!dispatcher.register_user_message(0x201));
        assert_eq!(dispatcher.transport().filter_configs(), 1);
        assert_eq!(dispatcher.transport().filters(), &[0x201]);

        for i in 1..MAX_USER_MESSAGES as u32 {
            assert!(dispatcher.register_user_message(0x201 + i));
        }
        assert!(!dispatcher.register_user_message(0x500));
    }

    #[test]
    fn test_clear_notifies_consumers() {
        CLEARS.store(0, Ordering::SeqCst);
        let mut dispatcher = FrameDispatcher::new(MockCanBus::new());
        dispatcher.register(consumer(first_rx));
        dispatcher.register(consumer(second_rx));
        dispatcher.register_user_message(0x201);

        dispatcher.clear_user_messages();
        assert!(dispatcher.user_ids().is_empty());
        assert!(dispatcher.transport().filters().is_empty());
        assert_eq!(CLEARS.load(Ordering::SeqCst), 2);
    }
}
