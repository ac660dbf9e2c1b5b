//! CAN link facade
//!
//! Wires the mapping table, the SDO server, the dispatcher and the
//! persistence layer into one unit: received frames enter through
//! [`CanLink::handle_frame`], the periodic task drives
//! [`CanLink::send_all`], and configuration tooling calls the table-editing
//! and save/load operations. A single busy flag suspends mapped-message
//! processing while a flash write is in progress; processing is skipped,
//! never blocked.

use crate::dispatcher::{FrameConsumer, FrameDispatcher};
use crate::mapping::{codec, CanMap, Direction, MapError, MappingInfo};
use crate::params::{to_fixed, ParamKind, ParamStore};
use crate::persistence::{self, CANMAP_FLASH_ADDRESS};
use crate::platform::{CanTransport, FlashInterface, Result};
use crate::sdo::{self, SdoFrame, SDO_REPLY_BASE, SDO_REQUEST_BASE};
use crate::{log_debug, log_info};

/// The CAN mapping subsystem
///
/// Owns the dispatcher (and through it the transport), the parameter store
/// handle and the mapping table. The subsystem acts as the first frame
/// consumer: SDO requests and mapped receive messages are handled before
/// any registered consumer sees the frame.
pub struct CanLink<T: CanTransport, P: ParamStore> {
    dispatcher: FrameDispatcher<T>,
    store: P,
    map: CanMap,
    node_id: u8,
    flash_base: u32,
    busy: bool,
}

impl<T: CanTransport, P: ParamStore> CanLink<T, P> {
    /// Create the subsystem with an empty table, node id 1 and the default
    /// flash location
    pub fn new(transport: T, store: P) -> Self {
        Self {
            dispatcher: FrameDispatcher::new(transport),
            store,
            map: CanMap::new(),
            node_id: 1,
            flash_base: CANMAP_FLASH_ADDRESS,
            busy: false,
        }
    }

    /// Set the node id used for the SDO request/reply identifiers
    pub fn set_node_id(&mut self, node_id: u8) {
        self.node_id = node_id;
    }

    /// Set the flash address of the persisted image
    pub fn set_flash_base(&mut self, base: u32) {
        self.flash_base = base;
    }

    /// Map a parameter into a periodically sent message
    ///
    /// Returns the number of distinct send identifiers on success.
    pub fn add_send(
        &mut self,
        param: u16,
        can_id: u32,
        bit_offset: u8,
        bits: u8,
        gain: f32,
        offset: i8,
    ) -> core::result::Result<usize, MapError> {
        self.map
            .add(Direction::Send, param, can_id, bit_offset, bits, gain, offset)
    }

    /// Map received message bits onto a parameter
    ///
    /// On success the identifier is also registered with the acceptance
    /// list. Returns the number of distinct receive identifiers.
    pub fn add_recv(
        &mut self,
        param: u16,
        can_id: u32,
        bit_offset: u8,
        bits: u8,
        gain: f32,
        offset: i8,
    ) -> core::result::Result<usize, MapError> {
        let count = self
            .map
            .add(Direction::Receive, param, can_id, bit_offset, bits, gain, offset)?;
        self.dispatcher.register_user_message(can_id);
        Ok(count)
    }

    /// Remove every mapping of `param` from both directions
    ///
    /// Identifiers whose last binding disappears stay on the acceptance
    /// list; their frames simply find no bindings.
    pub fn remove(&mut self, param: u16) -> usize {
        self.map.remove(param)
    }

    /// Find the first mapping of `param`, send direction first
    pub fn find_first(&self, param: u16) -> Option<MappingInfo> {
        self.map.find_first(param)
    }

    /// Visit every mapping for introspection or export
    pub fn for_each_binding(&self, visitor: impl FnMut(Direction, u32, &crate::mapping::Binding)) {
        self.map.for_each_binding(visitor)
    }

    /// Drop all mappings and all identifiers of interest
    pub fn clear_all(&mut self) {
        self.map.clear();
        self.dispatcher.clear_user_messages();
    }

    /// Register an additional frame consumer, invoked after the mapping
    /// subsystem declines a frame
    pub fn register_consumer(&mut self, consumer: FrameConsumer) -> bool {
        self.dispatcher.register(consumer)
    }

    /// Reset the acceptance list and let every consumer re-register
    ///
    /// The mapping table re-registers its own receive identifiers first.
    pub fn clear_user_messages(&mut self) {
        self.dispatcher.clear_user_messages();
        for id in self.map.receive_ids() {
            self.dispatcher.register_user_message(id);
        }
    }

    /// Handle one received frame
    ///
    /// SDO requests for this node are answered synchronously and always
    /// claimed. Mapped receive messages update their parameters unless a
    /// save is in progress. Everything else goes to the registered
    /// consumers; an unclaimed frame is dropped silently.
    pub fn handle_frame(&mut self, can_id: u32, data: [u32; 2]) -> bool {
        if can_id == SDO_REQUEST_BASE + self.node_id as u32 {
            let mut frame = SdoFrame::from_words(&data);
            let outcome = sdo::process(&mut frame, &mut self.store, &mut self.map);
            if let Some(id) = outcome.register_receive_id {
                self.dispatcher.register_user_message(id);
            }
            self.dispatcher
                .send(SDO_REPLY_BASE + self.node_id as u32, frame.to_words());
            return true;
        }

        if !self.busy {
            if let Some(entry) = self.map.find_entry(Direction::Receive, can_id) {
                let first = entry.first;
                for idx in self.map.chain(first) {
                    let binding = self.map.pool()[idx];
                    let value = codec::unpack(&data, &binding);
                    match self.store.kind(binding.param as usize) {
                        ParamKind::FixedPoint => {
                            // Range rejection leaves the parameter as-is
                            let _ = self.store.set_fixed(binding.param as usize, to_fixed(value));
                        }
                        ParamKind::Float => self.store.set_float(binding.param as usize, value),
                    }
                }
                return true;
            }
        }

        self.dispatcher.dispatch(can_id, &data)
    }

    /// Pack and transmit every send-direction message
    ///
    /// Skipped entirely while a save is in progress.
    pub fn send_all(&mut self) {
        if self.busy {
            return;
        }
        for entry in *self.map.entries(Direction::Send) {
            if !entry.is_occupied() {
                continue;
            }
            let mut data = [0u32; 2];
            for idx in self.map.chain(entry.first) {
                let binding = self.map.pool()[idx];
                let value = self.store.get_float(binding.param as usize);
                codec::pack(value, &binding, &mut data);
            }
            self.dispatcher.send(entry.can_id, data);
        }
    }

    /// Persist the mapping table to flash
    ///
    /// Mapped-message processing and the send sweep are suspended for the
    /// duration, including error exits.
    pub fn save<F: FlashInterface>(&mut self, flash: &mut F) -> Result<()> {
        self.busy = true;
        let result = persistence::save(flash, self.flash_base, &self.map, &self.store);
        self.busy = false;
        result
    }

    /// Restore the mapping table from flash at startup
    ///
    /// Returns true when a valid image was restored; its receive
    /// identifiers are registered with the acceptance list. A blank or
    /// corrupted image leaves the table empty.
    pub fn load<F: FlashInterface>(&mut self, flash: &F) -> Result<bool> {
        match persistence::load(flash, self.flash_base, &self.store)? {
            Some(map) => {
                self.map = map;
                for id in self.map.receive_ids() {
                    self.dispatcher.register_user_message(id);
                }
                log_info!(
                    "restored mapping table: {} send, {} recv messages",
                    self.map.message_count(Direction::Send),
                    self.map.message_count(Direction::Receive)
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Send an SDO write request to another node
    pub fn sdo_write(&mut self, remote_node: u8, index: u16, sub_index: u8, data: u32) {
        let frame = SdoFrame::write_request(index, sub_index, data);
        log_debug!("sdo write to node {}", remote_node);
        self.dispatcher
            .send(SDO_REQUEST_BASE + remote_node as u32, frame.to_words());
    }

    /// Access the parameter store
    pub fn store(&self) -> &P {
        &self.store
    }

    /// Mutable access to the parameter store
    pub fn store_mut(&mut self) -> &mut P {
        &mut self.store
    }

    /// Access the dispatcher (acceptance list, transport)
    pub fn dispatcher(&self) -> &FrameDispatcher<T> {
        &self.dispatcher
    }

    /// Current mapping table contents
    pub fn map(&self) -> &CanMap {
        &self.map
    }

    #[cfg(test)]
    fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }
}
