//! Non-volatile persistence of the mapping table
//!
//! The table is serialized to one flash erase unit as
//! `[send table][receive table][binding pool][CRC32 word]`. Parameter
//! references are stored as persistent identifiers so the image stays valid
//! across firmware rebuilds that reorder the parameter enumeration; they are
//! remapped back to enumeration indices on load. A checksum mismatch (blank
//! or corrupted device) silently yields no table at all - the fail-safe
//! default.
//!
//! Image word layout: message entries take 2 words (identifier, chain head),
//! bindings take 3 (parameter + bit position, gain bits, offset + link).

use crate::log_warn;
use crate::mapping::{CanMap, Direction, ITEM_END, ITEM_UNSET, MAX_ITEMS, MAX_MESSAGES};
use crate::params::ParamStore;
use crate::platform::{FlashInterface, Result};
use crc::{Crc, CRC_32_ISO_HDLC};

/// Default flash address of the mapping image
pub const CANMAP_FLASH_ADDRESS: u32 = 0x0004_4000;

/// Words per serialized message entry
const ENTRY_WORDS: usize = 2;

/// Words per serialized binding
const BINDING_WORDS: usize = 3;

/// Words per direction table
const TABLE_WORDS: usize = MAX_MESSAGES * ENTRY_WORDS;

/// Words in the serialized pool
const POOL_WORDS: usize = MAX_ITEMS * BINDING_WORDS;

/// Image payload words, excluding the trailing checksum
const DATA_WORDS: usize = 2 * TABLE_WORDS + POOL_WORDS;

/// Smallest erase unit the image must fit into, including the checksum
const MIN_ERASE_UNIT: usize = 4096;

// The whole image, checksum included, must fit one erase unit.
const _: () = assert!((DATA_WORDS + 1) * 4 <= MIN_ERASE_UNIT);

/// CRC32 algorithm (ISO HDLC), fed word by word while programming
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Serialize the table and write it to flash at `base`
///
/// The target unit is erased first unless it already reads fully erased.
/// Every reachable binding's parameter reference is stored as its persistent
/// identifier; the runtime table is left untouched. The streaming checksum
/// over all data words is programmed as the trailing word.
pub fn save<P: ParamStore, F: FlashInterface>(
    flash: &mut F,
    base: u32,
    map: &CanMap,
    store: &P,
) -> Result<()> {
    // Erase only when needed
    let unit_words = flash.erase_size() / 4;
    let mut check = 0xFFFF_FFFFu32;
    for i in 0..unit_words {
        check &= flash.read_word(base + i * 4)?;
    }
    if check != 0xFFFF_FFFF {
        flash.erase(base)?;
    }

    let words = serialize(map, store);

    let mut digest = CRC32.digest();
    for (i, word) in words.iter().enumerate() {
        digest.update(&word.to_le_bytes());
        flash.program_word(base + (i * 4) as u32, *word)?;
    }
    flash.program_word(base + (DATA_WORDS * 4) as u32, digest.finalize())?;

    Ok(())
}

/// Read the image at `base` and reconstruct the table
///
/// Returns `Ok(None)` when the stored checksum does not match, when a
/// persistent identifier is unknown to `store`, or when a stored link is out
/// of range - in every such case the caller keeps its empty table.
pub fn load<P: ParamStore, F: FlashInterface>(
    flash: &F,
    base: u32,
    store: &P,
) -> Result<Option<CanMap>> {
    let mut words = [0u32; DATA_WORDS];
    let mut digest = CRC32.digest();
    for (i, word) in words.iter_mut().enumerate() {
        *word = flash.read_word(base + (i * 4) as u32)?;
        digest.update(&word.to_le_bytes());
    }
    let stored_crc = flash.read_word(base + (DATA_WORDS * 4) as u32)?;

    if digest.finalize() != stored_crc {
        log_warn!("mapping image checksum mismatch, starting empty");
        return Ok(None);
    }

    Ok(deserialize(&words, store))
}

fn serialize<P: ParamStore>(map: &CanMap, store: &P) -> [u32; DATA_WORDS] {
    let mut words = [0u32; DATA_WORDS];

    for (d, direction) in [Direction::Send, Direction::Receive].iter().enumerate() {
        let table_base = d * TABLE_WORDS;
        for (i, entry) in map.entries(*direction).iter().enumerate() {
            words[table_base + i * ENTRY_WORDS] = entry.can_id;
            words[table_base + i * ENTRY_WORDS + 1] = entry.first as u32;
        }
    }

    let pool_base = 2 * TABLE_WORDS;
    for (i, binding) in map.pool().iter().enumerate() {
        let off = pool_base + i * BINDING_WORDS;
        words[off] = binding.param as u32
            | (binding.bit_offset as u32) << 16
            | (binding.bits as u32) << 24;
        words[off + 1] = binding.gain.to_bits();
        words[off + 2] = (binding.offset as u8) as u32 | (binding.next as u32) << 8;
    }

    // Replace enumeration indices with persistent identifiers on every
    // binding reachable through a chain; free slots keep their stale bytes.
    for direction in [Direction::Send, Direction::Receive] {
        for entry in map.entries(direction).iter().filter(|e| e.is_occupied()) {
            for idx in map.chain(entry.first) {
                let off = pool_base + idx * BINDING_WORDS;
                let uid = store.unique_id(map.pool()[idx].param as usize);
                words[off] = (words[off] & !0xFFFF) | uid as u32;
            }
        }
    }

    words
}

fn deserialize<P: ParamStore>(words: &[u32; DATA_WORDS], store: &P) -> Option<CanMap> {
    let mut map = CanMap::new();

    for (d, direction) in [Direction::Send, Direction::Receive].iter().enumerate() {
        let table_base = d * TABLE_WORDS;
        let entries = map.entries_mut(*direction);
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.can_id = words[table_base + i * ENTRY_WORDS];
            let first = words[table_base + i * ENTRY_WORDS + 1];
            if first > ITEM_END as u32 {
                return None;
            }
            entry.first = first as u8;
        }
    }

    let pool_base = 2 * TABLE_WORDS;
    for i in 0..MAX_ITEMS {
        let off = pool_base + i * BINDING_WORDS;
        let w0 = words[off];
        let w2 = words[off + 2];
        let next = ((w2 >> 8) & 0xFF) as u8;
        if next != ITEM_UNSET && next > ITEM_END {
            return None;
        }
        map.pool_mut()[i] = crate::mapping::Binding {
            param: (w0 & 0xFFFF) as u16,
            bit_offset: ((w0 >> 16) & 0xFF) as u8,
            bits: ((w0 >> 24) & 0xFF) as u8,
            gain: f32::from_bits(words[off + 1]),
            offset: (w2 & 0xFF) as u8 as i8,
            next,
        };
    }

    // Resolve persistent identifiers back to enumeration indices. An
    // identifier this build does not know invalidates the whole image.
    for direction in [Direction::Send, Direction::Receive] {
        for e in 0..MAX_MESSAGES {
            let entry = map.entries(direction)[e];
            if !entry.is_occupied() {
                continue;
            }
            let mut visited = 0;
            let mut idx = entry.first as usize;
            loop {
                let uid = map.pool()[idx].param;
                let param = store.index_from_unique_id(uid)?;
                map.pool_mut()[idx].param = param as u16;

                visited += 1;
                if visited > MAX_ITEMS {
                    // Link cycle; cannot come from a well-formed image
                    return None;
                }
                let next = map.pool()[idx].next;
                if (next as usize) >= MAX_ITEMS {
                    break;
                }
                idx = next as usize;
            }
        }
    }

    Some(map)
}
