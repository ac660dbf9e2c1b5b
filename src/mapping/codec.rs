//! Bit-field pack/unpack arithmetic
//!
//! A field lies entirely within one of the two payload words: `bit_offset`
//! above 31 selects the high word. Fields straddling the word boundary are
//! not supported; offsets and widths must be chosen accordingly.
//!
//! Gain is applied multiplicatively on both paths, in the direction the
//! mapping was configured for: receive computes `(raw + offset) * gain`,
//! send computes `value * gain + offset` before truncating to the field. A
//! matched send/receive pair therefore uses reciprocal gains.

use super::table::Binding;

/// Field mask for a width in bits, safe at the full 32-bit width
fn mask(bits: u8) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

/// Extract the binding's field from a payload and rescale it
pub fn unpack(data: &[u32; 2], binding: &Binding) -> f32 {
    let raw = if binding.bit_offset > 31 {
        (data[1] >> (binding.bit_offset - 32)) & mask(binding.bits)
    } else {
        (data[0] >> binding.bit_offset) & mask(binding.bits)
    };
    (raw as f32 + binding.offset as f32) * binding.gain
}

/// Scale a value, truncate it to the binding's field and OR it into the
/// payload
pub fn pack(value: f32, binding: &Binding, data: &mut [u32; 2]) {
    let scaled = value * binding.gain + binding.offset as f32;
    let field = (scaled as i32 as u32) & mask(binding.bits);
    if binding.bit_offset > 31 {
        data[1] |= field << (binding.bit_offset - 32);
    } else {
        data[0] |= field << binding.bit_offset;
    }
}
