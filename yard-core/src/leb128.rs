//! LEB128 variable-length integers.
//!
//! Values are written 7 bits at a time, least significant group first, with
//! the high bit of every byte but the last set.

pub fn write_unsigned(sink: &mut Vec<u8>, mut value: u64) {
    loop {
        let chunk = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            sink.push(chunk);
            return;
        }
        sink.push(chunk | 0x80);
    }
}

pub fn write_signed(sink: &mut Vec<u8>, mut value: i64) {
    loop {
        let chunk = (value & 0x7f) as u8;
        // arithmetic shift keeps the sign
        value >>= 7;
        let sign_bit_set = chunk & 0x40 != 0;
        let done = (value == 0 && !sign_bit_set) || (value == -1 && sign_bit_set);
        if done {
            sink.push(chunk);
            return;
        }
        sink.push(chunk | 0x80);
    }
}

/// Decodes an unsigned value, returning it and the number of bytes read.
/// `None` if the input ends early or the value does not fit in 64 bits.
pub fn read_unsigned(bytes: &[u8]) -> Option<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0u32;
    for (i, byte) in bytes.iter().enumerate() {
        let low = u64::from(byte & 0x7f);
        if shift >= 64 || (shift == 63 && low > 1) {
            return None;
        }
        result |= low << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }
    }
    None
}

/// Decodes a signed value, returning it and the number of bytes read.
pub fn read_signed(bytes: &[u8]) -> Option<(i64, usize)> {
    let mut result = 0i64;
    let mut shift = 0u32;
    for (i, byte) in bytes.iter().enumerate() {
        if shift >= 64 {
            return None;
        }
        result |= i64::from(byte & 0x7f) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            if shift < 64 && byte & 0x40 != 0 {
                result |= -1i64 << shift;
            }
            return Some((result, i + 1));
        }
    }
    None
}
