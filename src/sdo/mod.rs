//! CANopen-style SDO request/reply protocol
//!
//! Stateless request handler listening on `0x600 + node_id` and replying on
//! `0x580 + node_id`. Requests read or write parameter values, address
//! parameters by persistent identifier, and install new mapping-table
//! bindings remotely. Every request produces exactly one reply, rewritten
//! in place over the request frame.

use crate::mapping::{CanMap, Direction};
use crate::params::{from_fixed, ParamStore};

/// Base identifier for SDO requests (`+ node_id`)
pub const SDO_REQUEST_BASE: u32 = 0x600;

/// Base identifier for SDO replies (`+ node_id`)
pub const SDO_REPLY_BASE: u32 = 0x580;

/// Command: write a value
pub const SDO_WRITE: u8 = 0x40;

/// Command: read a value
pub const SDO_READ: u8 = 0x22;

/// Reply to a successful write
pub const SDO_WRITE_REPLY: u8 = 0x23;

/// Reply to a successful read
pub const SDO_READ_REPLY: u8 = 0x43;

/// Abort reply; the data field carries the abort code
pub const SDO_ABORT: u8 = 0x80;

/// Abort code: request addressed an unrecognized index
pub const SDO_ERR_INVALID_INDEX: u32 = 0x0602_0000;

/// Abort code: value or mapping request out of range
pub const SDO_ERR_RANGE: u32 = 0x0609_0030;

/// Parameter access by enumeration index
const INDEX_PARAM: u16 = 0x2000;

/// Parameter access by persistent identifier
const INDEX_PARAM_BY_UID: u16 = 0x2001;

/// Start of the mapping-configuration index range
const INDEX_MAP_START: u16 = 0x3000;

/// End of the mapping-configuration index range (inclusive)
const INDEX_MAP_END: u16 = 0x47FF;

/// Index bit selecting the receive direction for mapping requests
const INDEX_MAP_RECEIVE_BIT: u16 = 0x4000;

/// Index bits carrying the CAN identifier for mapping requests
const INDEX_MAP_ID_MASK: u16 = 0x7FF;

/// One SDO request or reply
///
/// Wire layout (8 bytes): command, index (little-endian u16), sub-index,
/// data (little-endian u32).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdoFrame {
    /// Command byte
    pub cmd: u8,
    /// Object index
    pub index: u16,
    /// Sub-index
    pub sub_index: u8,
    /// Data field
    pub data: u32,
}

impl SdoFrame {
    /// Build a write request (client side)
    pub fn write_request(index: u16, sub_index: u8, data: u32) -> Self {
        Self {
            cmd: SDO_WRITE,
            index,
            sub_index,
            data,
        }
    }

    /// Decode from the 8 payload bytes
    pub fn from_bytes(bytes: &[u8; 8]) -> Self {
        Self {
            cmd: bytes[0],
            index: u16::from_le_bytes([bytes[1], bytes[2]]),
            sub_index: bytes[3],
            data: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Encode to the 8 payload bytes
    pub fn to_bytes(&self) -> [u8; 8] {
        let index = self.index.to_le_bytes();
        let data = self.data.to_le_bytes();
        [
            self.cmd, index[0], index[1], self.sub_index, data[0], data[1], data[2], data[3],
        ]
    }

    /// Decode from a two-word frame payload
    pub fn from_words(words: &[u32; 2]) -> Self {
        let low = words[0].to_le_bytes();
        let high = words[1].to_le_bytes();
        Self::from_bytes(&[
            low[0], low[1], low[2], low[3], high[0], high[1], high[2], high[3],
        ])
    }

    /// Encode to a two-word frame payload
    pub fn to_words(&self) -> [u32; 2] {
        let bytes = self.to_bytes();
        [
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        ]
    }

    fn abort(&mut self, code: u32) {
        self.cmd = SDO_ABORT;
        self.data = code;
    }
}

/// Side effects requested by a processed SDO frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SdoOutcome {
    /// A receive-direction mapping was installed; register this identifier
    /// with the dispatcher's acceptance list
    pub register_receive_id: Option<u32>,
}

/// Process one SDO request, rewriting `frame` into the reply
///
/// Every branch, success or failure, leaves `frame` holding exactly one
/// reply: `SDO_WRITE_REPLY`/`SDO_READ_REPLY` on success, `SDO_ABORT` with an
/// abort code in the data field on failure. A recognized index with an
/// unrecognized command echoes the request unchanged.
pub fn process<P: ParamStore>(frame: &mut SdoFrame, store: &mut P, map: &mut CanMap) -> SdoOutcome {
    let mut outcome = SdoOutcome::default();
    let known_param = (frame.sub_index as usize) < store.count();

    if (INDEX_PARAM..=INDEX_PARAM_BY_UID).contains(&frame.index) && known_param {
        // Index 0x2001 addresses the parameter by its persistent identifier,
        // so tools built against a different firmware build still reach the
        // same logical parameter.
        let param = if frame.index == INDEX_PARAM_BY_UID {
            match store.index_from_unique_id(frame.sub_index as u16) {
                Some(idx) => idx,
                None => {
                    frame.abort(SDO_ERR_RANGE);
                    return outcome;
                }
            }
        } else {
            frame.sub_index as usize
        };

        match frame.cmd {
            SDO_WRITE => {
                if store.set_raw(param, frame.data).is_ok() {
                    frame.cmd = SDO_WRITE_REPLY;
                } else {
                    frame.abort(SDO_ERR_RANGE);
                }
            }
            SDO_READ => {
                frame.data = store.get_raw(param);
                frame.cmd = SDO_READ_REPLY;
            }
            _ => {}
        }
    } else if (INDEX_MAP_START..=INDEX_MAP_END).contains(&frame.index) && known_param {
        if frame.cmd == SDO_WRITE {
            let bit_offset = (frame.data & 0xFF) as u8;
            let bits = ((frame.data >> 8) & 0xFF) as u8;
            let gain = from_fixed(((frame.data >> 16) & 0xFFFF) as i32);
            let can_id = (frame.index & INDEX_MAP_ID_MASK) as u32;
            let direction = if frame.index & INDEX_MAP_RECEIVE_BIT != 0 {
                Direction::Receive
            } else {
                Direction::Send
            };

            match map.add(
                direction,
                frame.sub_index as u16,
                can_id,
                bit_offset,
                bits,
                gain,
                0,
            ) {
                Ok(_) => {
                    frame.cmd = SDO_WRITE_REPLY;
                    if direction == Direction::Receive {
                        outcome.register_receive_id = Some(can_id);
                    }
                }
                Err(_) => frame.abort(SDO_ERR_RANGE),
            }
        }
    } else {
        frame.abort(SDO_ERR_INVALID_INDEX);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{to_fixed, MockParamStore, ParamDef};

    fn store() -> MockParamStore {
        MockParamStore::new(&[
            ParamDef::fixed("speed_limit", 17, 0.0, 100.0),
            ParamDef::fixed("boost", 23, 0.0, 50.0),
        ])
    }

    #[test]
    fn test_frame_byte_layout() {
        let frame = SdoFrame {
            cmd: SDO_WRITE,
            index: 0x2000,
            sub_index: 1,
            data: 0x1122_3344,
        };
        assert_eq!(
            frame.to_bytes(),
            [0x40, 0x00, 0x20, 0x01, 0x44, 0x33, 0x22, 0x11]
        );
        assert_eq!(SdoFrame::from_bytes(&frame.to_bytes()), frame);

        let words = frame.to_words();
        assert_eq!(words, [0x0120_0040, 0x1122_3344]);
        assert_eq!(SdoFrame::from_words(&words), frame);
    }

    #[test]
    fn test_parameter_write() {
        let mut store = store();
        let mut map = CanMap::new();
        let mut frame = SdoFrame::write_request(0x2000, 0, to_fixed(60.0) as u32);

        process(&mut frame, &mut store, &mut map);
        assert_eq!(frame.cmd, SDO_WRITE_REPLY);
        assert_eq!(store.get_float(0), 60.0);
    }

    #[test]
    fn test_parameter_write_out_of_range_aborts() {
        let mut store = store();
        let mut map = CanMap::new();
        let mut frame = SdoFrame::write_request(0x2000, 0, to_fixed(150.0) as u32);

        process(&mut frame, &mut store, &mut map);
        assert_eq!(frame.cmd, SDO_ABORT);
        assert_eq!(frame.data, SDO_ERR_RANGE);
        // Parameter unchanged
        assert_eq!(store.get_float(0), 0.0);
    }

    #[test]
    fn test_parameter_read() {
        let mut store = store();
        store.set_fixed(1, to_fixed(12.5)).unwrap();
        let mut map = CanMap::new();
        let mut frame = SdoFrame {
            cmd: SDO_READ,
            index: 0x2000,
            sub_index: 1,
            data: 0,
        };

        process(&mut frame, &mut store, &mut map);
        assert_eq!(frame.cmd, SDO_READ_REPLY);
        assert_eq!(frame.data, to_fixed(12.5) as u32);
    }

    #[test]
    fn test_parameter_access_by_unique_id() {
        let mut store = store();
        let mut map = CanMap::new();

        // Unique id 23 resolves to enumeration index 1
        let mut frame = SdoFrame::write_request(0x2001, 23, to_fixed(25.0) as u32);
        process(&mut frame, &mut store, &mut map);
        assert_eq!(frame.cmd, SDO_WRITE_REPLY);
        assert_eq!(store.get_float(1), 25.0);

        // Unknown unique id aborts
        let mut frame = SdoFrame::write_request(0x2001, 99, 0);
        process(&mut frame, &mut store, &mut map);
        assert_eq!(frame.cmd, SDO_ABORT);
        assert_eq!(frame.data, SDO_ERR_RANGE);
    }

    #[test]
    fn test_install_receive_mapping() {
        let mut store = store();
        let mut map = CanMap::new();

        // id 0x201, receive direction, offset 0, length 8, gain 1.0 (Q27.5)
        let data = (to_fixed(1.0) as u32) << 16 | 8 << 8;
        let mut frame = SdoFrame::write_request(0x4000 | 0x201, 0, data);

        let outcome = process(&mut frame, &mut store, &mut map);
        assert_eq!(frame.cmd, SDO_WRITE_REPLY);
        assert_eq!(outcome.register_receive_id, Some(0x201));

        let info = map.find_first(0).unwrap();
        assert_eq!(info.direction, Direction::Receive);
        assert_eq!(info.can_id, 0x201);
        assert_eq!(info.bit_offset, 0);
        assert_eq!(info.bits, 8);
        assert_eq!(info.gain, 1.0);
    }

    #[test]
    fn test_install_send_mapping() {
        let mut store = store();
        let mut map = CanMap::new();

        let data = (to_fixed(0.5) as u32) << 16 | 16 << 8 | 8;
        let mut frame = SdoFrame::write_request(0x3000 | 0x101, 1, data);

        let outcome = process(&mut frame, &mut store, &mut map);
        assert_eq!(frame.cmd, SDO_WRITE_REPLY);
        assert_eq!(outcome.register_receive_id, None);

        let info = map.find_first(1).unwrap();
        assert_eq!(info.direction, Direction::Send);
        assert_eq!(info.can_id, 0x101);
        assert_eq!(info.bit_offset, 8);
        assert_eq!(info.bits, 16);
        assert_eq!(info.gain, 0.5);
    }

    #[test]
    fn test_install_mapping_failure_aborts() {
        let mut store = store();
        let mut map = CanMap::new();

        // Bit offset 200 is rejected by the mapping table
        let mut frame = SdoFrame::write_request(0x4000 | 0x201, 0, 8 << 8 | 200);
        process(&mut frame, &mut store, &mut map);
        assert_eq!(frame.cmd, SDO_ABORT);
        assert_eq!(frame.data, SDO_ERR_RANGE);
    }

    #[test]
    fn test_unknown_index_aborts() {
        let mut store = store();
        let mut map = CanMap::new();

        let mut frame = SdoFrame::write_request(0x5000, 0, 0);
        process(&mut frame, &mut store, &mut map);
        assert_eq!(frame.cmd, SDO_ABORT);
        assert_eq!(frame.data, SDO_ERR_INVALID_INDEX);

        // Sub-index beyond the parameter count is equally unrecognized
        let mut frame = SdoFrame::write_request(0x2000, 99, 0);
        process(&mut frame, &mut store, &mut map);
        assert_eq!(frame.cmd, SDO_ABORT);
        assert_eq!(frame.data, SDO_ERR_INVALID_INDEX);
    }

    #[test]
    fn test_unrecognized_command_echoes() {
        let mut store = store();
        let mut map = CanMap::new();

        let mut frame = SdoFrame {
            cmd: 0x77,
            index: 0x2000,
            sub_index: 0,
            data: 5,
        };
        let original = frame;
        process(&mut frame, &mut store, &mut map);
        assert_eq!(frame, original);
    }
}
