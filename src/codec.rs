//! Register-level value codecs.
//!
//! The controller stores 32-bit floats as two consecutive 16-bit holding
//! registers, high word first, big-endian within each word. Coils map 1:1
//! to booleans. All functions here are total: NaN and infinities pass
//! through bit-for-bit.

/// Encode a 32-bit float as a big-endian register pair, high word first.
pub fn encode_float32(value: f32) -> [u16; 2] {
    let bits = value.to_bits();
    [(bits >> 16) as u16, (bits & 0xFFFF) as u16]
}

/// Decode a big-endian register pair (high word first) into a 32-bit float.
pub fn decode_float32(hi: u16, lo: u16) -> f32 {
    let bits = ((hi as u32) << 16) | (lo as u32);
    f32::from_bits(bits)
}

/// Encode a boolean as a coil value.
pub fn encode_coil(value: bool) -> bool {
    value
}

/// Decode a coil value into a boolean.
pub fn decode_coil(bit: bool) -> bool {
    bit
}
