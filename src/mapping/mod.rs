//! Message mapping engine
//!
//! The arena-based table that associates CAN identifiers with bit-level
//! parameter bindings ([`table`]) and the pack/unpack arithmetic that moves
//! values between frame payloads and parameters ([`codec`]).

pub mod codec;
pub mod error;
pub mod table;

pub use error::MapError;
pub use table::{
    Binding, CanMap, Direction, MappingInfo, MessageEntry, ITEM_END, ITEM_UNSET, MAX_ITEMS,
    MAX_MESSAGES,
};
