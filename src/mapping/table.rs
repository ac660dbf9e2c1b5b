//! Arena-based mapping table
//!
//! Two fixed-capacity tables of message entries (send and receive direction)
//! share one pool of bit-field bindings. Each entry owns a chain of bindings
//! linked by pool indices; a link equal to [`ITEM_END`] terminates the chain
//! and a link equal to [`ITEM_UNSET`] marks the pool slot free. Free slots
//! are found by linear scan, so allocation order is deterministic and
//! observable.

use super::error::MapError;

/// Maximum distinct message identifiers per direction
pub const MAX_MESSAGES: usize = 10;

/// Capacity of the shared binding pool
pub const MAX_ITEMS: usize = 50;

/// Link value marking a free pool slot
pub const ITEM_UNSET: u8 = 0xFF;

/// Link value terminating a chain; also marks a free message entry when used
/// as the entry's head
pub const ITEM_END: u8 = MAX_ITEMS as u8;

/// Highest valid CAN identifier (29-bit extended range)
pub const MAX_CAN_ID: u32 = 0x1FFF_FFFF;

/// Message direction namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device to bus, swept periodically
    Send,
    /// Bus to device, driven by frame reception
    Receive,
}

/// One bit-field mapping within a message
///
/// `param` holds the runtime enumeration index; the persistence layer swaps
/// it for the persistent identifier in the stored image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binding {
    /// Parameter reference (enumeration index at runtime)
    pub param: u16,
    /// Multiplicative gain
    pub gain: f32,
    /// Signed bias added after unpacking / before packing
    pub offset: i8,
    /// Bit offset into the 64 payload bits (0..=63)
    pub bit_offset: u8,
    /// Field width in bits (..=32)
    pub bits: u8,
    /// Next pool index in the chain, [`ITEM_END`] or [`ITEM_UNSET`]
    pub next: u8,
}

impl Binding {
    pub(crate) const fn free() -> Self {
        Self {
            param: 0,
            gain: 0.0,
            offset: 0,
            bit_offset: 0,
            bits: 0,
            next: ITEM_UNSET,
        }
    }
}

/// A message identifier plus the head of its binding chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageEntry {
    /// CAN identifier
    pub can_id: u32,
    /// Pool index of the first binding, [`ITEM_END`] when the slot is free
    pub first: u8,
}

impl MessageEntry {
    pub(crate) const fn free() -> Self {
        Self {
            can_id: 0,
            first: ITEM_END,
        }
    }

    /// Whether this entry currently owns a chain
    pub fn is_occupied(&self) -> bool {
        (self.first as usize) < MAX_ITEMS
    }
}

/// Result of a mapping lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappingInfo {
    /// CAN identifier the parameter is mapped to
    pub can_id: u32,
    /// Bit offset of the field
    pub bit_offset: u8,
    /// Field width in bits
    pub bits: u8,
    /// Gain of the mapping
    pub gain: f32,
    /// Direction the mapping belongs to
    pub direction: Direction,
}

/// The mapping table: send and receive entry tables over one shared pool
#[derive(Debug, Clone, PartialEq)]
pub struct CanMap {
    send: [MessageEntry; MAX_MESSAGES],
    recv: [MessageEntry; MAX_MESSAGES],
    pool: [Binding; MAX_ITEMS],
}

impl Default for CanMap {
    fn default() -> Self {
        Self::new()
    }
}

impl CanMap {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            send: [MessageEntry::free(); MAX_MESSAGES],
            recv: [MessageEntry::free(); MAX_MESSAGES],
            pool: [Binding::free(); MAX_ITEMS],
        }
    }

    /// Add a binding for `param` to the message `can_id` in `direction`
    ///
    /// Finds or allocates the message entry, takes the first free pool slot
    /// and appends the binding at the tail of the entry's chain. Returns the
    /// number of distinct identifiers now defined in that direction.
    ///
    /// # Errors
    ///
    /// - [`MapError::InvalidId`]: `can_id` above the 29-bit range
    /// - [`MapError::InvalidOffset`]: `bit_offset` above 63
    /// - [`MapError::InvalidLength`]: `bits` above 32
    /// - [`MapError::MaxMessages`]: the direction's table is full
    /// - [`MapError::MaxItems`]: the shared pool is exhausted
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &mut self,
        direction: Direction,
        param: u16,
        can_id: u32,
        bit_offset: u8,
        bits: u8,
        gain: f32,
        offset: i8,
    ) -> Result<usize, MapError> {
        if can_id > MAX_CAN_ID {
            return Err(MapError::InvalidId);
        }
        if bit_offset > 63 {
            return Err(MapError::InvalidOffset);
        }
        if bits > 32 {
            return Err(MapError::InvalidLength);
        }

        let table = match direction {
            Direction::Send => &mut self.send,
            Direction::Receive => &mut self.recv,
        };

        let entry_idx = match table
            .iter()
            .position(|e| e.is_occupied() && e.can_id == can_id)
        {
            Some(idx) => idx,
            None => {
                let idx = table
                    .iter()
                    .position(|e| !e.is_occupied())
                    .ok_or(MapError::MaxMessages)?;
                table[idx].can_id = can_id;
                idx
            }
        };

        // Linear scan for a free pool slot; allocation order is part of the
        // observable behavior.
        let slot = self
            .pool
            .iter()
            .position(|b| b.next == ITEM_UNSET)
            .ok_or(MapError::MaxItems)?;

        self.pool[slot] = Binding {
            param,
            gain,
            offset,
            bit_offset,
            bits,
            next: ITEM_END,
        };

        // Append at the tail of the chain
        let head = table[entry_idx].first;
        if (head as usize) < MAX_ITEMS {
            let mut tail = head as usize;
            while (self.pool[tail].next as usize) < MAX_ITEMS {
                tail = self.pool[tail].next as usize;
            }
            self.pool[tail].next = slot as u8;
        } else {
            table[entry_idx].first = slot as u8;
        }

        Ok(table.iter().filter(|e| e.is_occupied()).count())
    }

    /// Remove every binding referencing `param` from both directions
    ///
    /// Matching bindings are unlinked from their chains and their pool slots
    /// marked free. An entry whose chain empties stays in place with a free
    /// head and is reusable by a later add. Returns the number of bindings
    /// removed.
    pub fn remove(&mut self, param: u16) -> usize {
        let mut removed = 0;
        for direction in [Direction::Send, Direction::Receive] {
            let table = match direction {
                Direction::Send => &mut self.send,
                Direction::Receive => &mut self.recv,
            };

            for entry in table.iter_mut() {
                let mut prev: Option<usize> = None;
                let mut cur = entry.first;

                while (cur as usize) < MAX_ITEMS {
                    let idx = cur as usize;
                    let next = self.pool[idx].next;

                    if self.pool[idx].param == param {
                        match prev {
                            Some(p) => self.pool[p].next = next,
                            None => entry.first = next,
                        }
                        self.pool[idx].next = ITEM_UNSET;
                        removed += 1;
                    } else {
                        prev = Some(idx);
                    }
                    cur = next;
                }
            }
        }
        removed
    }

    /// Find the first mapping of `param`, searching send before receive
    pub fn find_first(&self, param: u16) -> Option<MappingInfo> {
        for direction in [Direction::Send, Direction::Receive] {
            for entry in self.entries(direction).iter().filter(|e| e.is_occupied()) {
                for idx in self.chain(entry.first) {
                    let b = &self.pool[idx];
                    if b.param == param {
                        return Some(MappingInfo {
                            can_id: entry.can_id,
                            bit_offset: b.bit_offset,
                            bits: b.bits,
                            gain: b.gain,
                            direction,
                        });
                    }
                }
            }
        }
        None
    }

    /// Visit every binding: send direction fully before receive, table order
    /// then chain order
    pub fn for_each_binding(&self, mut visitor: impl FnMut(Direction, u32, &Binding)) {
        for direction in [Direction::Send, Direction::Receive] {
            for entry in self.entries(direction).iter().filter(|e| e.is_occupied()) {
                for idx in self.chain(entry.first) {
                    visitor(direction, entry.can_id, &self.pool[idx]);
                }
            }
        }
    }

    /// Reset both tables and the pool to all-free
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Number of distinct identifiers defined in `direction`
    pub fn message_count(&self, direction: Direction) -> usize {
        self.entries(direction)
            .iter()
            .filter(|e| e.is_occupied())
            .count()
    }

    /// Identifiers currently mapped in the receive direction
    pub fn receive_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.recv.iter().filter(|e| e.is_occupied()).map(|e| e.can_id)
    }

    /// Look up the occupied entry for `can_id` in `direction`
    pub(crate) fn find_entry(&self, direction: Direction, can_id: u32) -> Option<&MessageEntry> {
        self.entries(direction)
            .iter()
            .find(|e| e.is_occupied() && e.can_id == can_id)
    }

    pub(crate) fn entries(&self, direction: Direction) -> &[MessageEntry; MAX_MESSAGES] {
        match direction {
            Direction::Send => &self.send,
            Direction::Receive => &self.recv,
        }
    }

    pub(crate) fn entries_mut(
        &mut self,
        direction: Direction,
    ) -> &mut [MessageEntry; MAX_MESSAGES] {
        match direction {
            Direction::Send => &mut self.send,
            Direction::Receive => &mut self.recv,
        }
    }

    pub(crate) fn pool(&self) -> &[Binding; MAX_ITEMS] {
        &self.pool
    }

    pub(crate) fn pool_mut(&mut self) -> &mut [Binding; MAX_ITEMS] {
        &mut self.pool
    }

    /// Iterate pool indices along a chain starting at `first`
    pub(crate) fn chain(&self, first: u8) -> ChainIter<'_> {
        ChainIter {
            pool: &self.pool,
            next: first,
        }
    }
}

/// Iterator over the pool indices of one chain
pub(crate) struct ChainIter<'a> {
    pool: &'a [Binding; MAX_ITEMS],
    next: u8,
}

impl Iterator for ChainIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if (self.next as usize) >= MAX_ITEMS {
            return None;
        }
        let idx = self.next as usize;
        self.next = self.pool[idx].next;
        Some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P0: u16 = 0;
    const P1: u16 = 1;
    const P2: u16 = 2;

    #[test]
    fn test_add_returns_message_count() {
        let mut map = CanMap::new();

        assert_eq!(map.add(Direction::Send, P0, 0x100, 0, 8, 1.0, 0), Ok(1));
        assert_eq!(map.add(Direction::Send, P1, 0x101, 8, 8, 1.0, 0), Ok(2));
        // Second binding on an existing identifier does not grow the count
        assert_eq!(map.add(Direction::Send, P2, 0x100, 16, 8, 1.0, 0), Ok(2));
        // Directions are independent namespaces
        assert_eq!(map.add(Direction::Receive, P0, 0x100, 0, 8, 1.0, 0), Ok(1));
    }

    #[test]
    fn test_add_validation() {
        let mut map = CanMap::new();

        assert_eq!(
            map.add(Direction::Send, P0, 0x2000_0000, 0, 8, 1.0, 0),
            Err(MapError::InvalidId)
        );
        assert_eq!(
            map.add(Direction::Send, P0, 0x100, 64, 8, 1.0, 0),
            Err(MapError::InvalidOffset)
        );
        assert_eq!(
            map.add(Direction::Send, P0, 0x100, 0, 33, 1.0, 0),
            Err(MapError::InvalidLength)
        );
        // Rejected adds leave the table untouched
        assert_eq!(map.message_count(Direction::Send), 0);
        // Boundary values pass
        assert!(map.add(Direction::Send, P0, MAX_CAN_ID, 63, 1, 1.0, 0).is_ok());
        assert!(map.add(Direction::Send, P0, 0x100, 0, 32, 1.0, 0).is_ok());
    }

    #[test]
    fn test_max_messages_per_direction() {
        let mut map = CanMap::new();

        for i in 0..MAX_MESSAGES {
            assert!(map
                .add(Direction::Send, P0, 0x100 + i as u32, 0, 8, 1.0, 0)
                .is_ok());
        }
        assert_eq!(
            map.add(Direction::Send, P0, 0x200, 0, 8, 1.0, 0),
            Err(MapError::MaxMessages)
        );
        // The receive table is unaffected
        assert!(map.add(Direction::Receive, P0, 0x200, 0, 8, 1.0, 0).is_ok());
    }

    #[test]
    fn test_pool_is_shared_across_directions() {
        let mut map = CanMap::new();

        // Fill most of the pool from the send side, rest from receive
        for i in 0..30 {
            map.add(Direction::Send, i as u16, 0x100, ((i % 8) * 8) as u8, 8, 1.0, 0)
                .unwrap();
        }
        for i in 0..(MAX_ITEMS - 30) {
            map.add(Direction::Receive, i as u16, 0x200, 0, 8, 1.0, 0)
                .unwrap();
        }
        assert_eq!(
            map.add(Direction::Receive, P0, 0x200, 0, 8, 1.0, 0),
            Err(MapError::MaxItems)
        );
        assert_eq!(
            map.add(Direction::Send, P0, 0x100, 0, 8, 1.0, 0),
            Err(MapError::MaxItems)
        );
    }

    #[test]
    fn test_remove_unlinks_and_frees() {
        let mut map = CanMap::new();

        map.add(Direction::Send, P0, 0x100, 0, 8, 1.0, 0).unwrap();
        map.add(Direction::Send, P1, 0x100, 8, 8, 1.0, 0).unwrap();
        map.add(Direction::Send, P0, 0x100, 16, 8, 1.0, 0).unwrap();
        map.add(Direction::Receive, P0, 0x200, 0, 8, 1.0, 0).unwrap();

        assert_eq!(map.remove(P0), 3);
        assert_eq!(map.find_first(P0), None);
        assert!(map.find_first(P1).is_some());

        // Chain of 0x100 now only contains P1
        let mut seen = vec![];
        map.for_each_binding(|_, id, b| seen.push((id, b.param)));
        assert_eq!(seen, vec![(0x100, P1)]);
    }

    #[test]
    fn test_removed_slots_are_reused() {
        let mut map = CanMap::new();

        map.add(Direction::Send, P0, 0x100, 0, 8, 1.0, 0).unwrap();
        map.add(Direction::Send, P1, 0x100, 8, 8, 1.0, 0).unwrap();
        assert_eq!(map.remove(P0), 1);

        // The freed slot 0 is the first free slot found by the linear scan
        map.add(Direction::Send, P2, 0x100, 16, 8, 1.0, 0).unwrap();
        let mut order = vec![];
        map.for_each_binding(|_, _, b| order.push(b.param));
        // Chain order: P1 (head after unlink), then P2 appended at tail
        assert_eq!(order, vec![P1, P2]);
    }

    #[test]
    fn test_emptied_entry_is_reusable() {
        let mut map = CanMap::new();

        map.add(Direction::Receive, P0, 0x201, 0, 8, 1.0, 0).unwrap();
        map.add(Direction::Receive, P1, 0x202, 0, 8, 1.0, 0).unwrap();

        // Empty the first entry; the second must stay visible
        assert_eq!(map.remove(P0), 1);
        assert_eq!(map.message_count(Direction::Receive), 1);
        assert!(map.find_first(P1).is_some());

        // The freed entry slot is reusable for a new identifier
        assert_eq!(map.add(Direction::Receive, P2, 0x203, 0, 8, 1.0, 0), Ok(2));
        let ids: Vec<u32> = map.receive_ids().collect();
        assert_eq!(ids, vec![0x203, 0x202]);
    }

    #[test]
    fn test_find_first_prefers_send_direction() {
        let mut map = CanMap::new();

        map.add(Direction::Receive, P0, 0x200, 0, 8, 2.0, 0).unwrap();
        map.add(Direction::Send, P0, 0x100, 8, 16, 0.5, 0).unwrap();

        let info = map.find_first(P0).unwrap();
        assert_eq!(info.direction, Direction::Send);
        assert_eq!(info.can_id, 0x100);
        assert_eq!(info.bit_offset, 8);
        assert_eq!(info.bits, 16);
        assert_eq!(info.gain, 0.5);
    }

    #[test]
    fn test_for_each_binding_order() {
        let mut map = CanMap::new();

        map.add(Direction::Receive, P2, 0x300, 0, 8, 1.0, 0).unwrap();
        map.add(Direction::Send, P0, 0x100, 0, 8, 1.0, 0).unwrap();
        map.add(Direction::Send, P1, 0x100, 8, 8, 1.0, 0).unwrap();
        map.add(Direction::Send, P2, 0x101, 0, 8, 1.0, 0).unwrap();

        let mut visits = vec![];
        map.for_each_binding(|dir, id, b| visits.push((dir, id, b.param)));
        assert_eq!(
            visits,
            vec![
                (Direction::Send, 0x100, P0),
                (Direction::Send, 0x100, P1),
                (Direction::Send, 0x101, P2),
                (Direction::Receive, 0x300, P2),
            ]
        );
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut map = CanMap::new();

        map.add(Direction::Send, P0, 0x100, 0, 8, 1.0, 0).unwrap();
        map.add(Direction::Receive, P1, 0x200, 0, 8, 1.0, 0).unwrap();
        map.clear();

        assert_eq!(map, CanMap::new());
        assert_eq!(map.message_count(Direction::Send), 0);
        assert_eq!(map.find_first(P0), None);
    }
}
