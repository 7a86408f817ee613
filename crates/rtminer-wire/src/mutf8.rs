//! Modified UTF-8 as used by `DataOutput.writeUTF`.
//!
//! NUL is written as the two-byte form and supplementary characters as two
//! three-byte surrogates.

use crate::error::{CodecError, CodecResult};

/// Number of bytes `text` occupies once encoded.
pub fn encoded_len(text: &str) -> usize {
    text.encode_utf16()
        .map(|unit| match unit {
            0x0001..=0x007F => 1,
            0x0000 | 0x0080..=0x07FF => 2,
            _ => 3,
        })
        .sum()
}

/// Appends the encoding of `text` to `out`.
pub fn encode_into(text: &str, out: &mut Vec<u8>) {
    out.reserve(encoded_len(text));
    for unit in text.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
}

/// Encodes `text` into a fresh buffer.
pub fn encode(text: &str) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(text, &mut out);
    out
}

/// Decodes modified UTF-8. Unpaired surrogates are rejected.
pub fn decode(bytes: &[u8]) -> CodecResult<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(u16::from(b));
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = continuation(bytes, i + 1)?;
            units.push((u16::from(b & 0x1F) << 6) | u16::from(b2));
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = continuation(bytes, i + 1)?;
            let b3 = continuation(bytes, i + 2)?;
            units.push((u16::from(b & 0x0F) << 12) | (u16::from(b2) << 6) | u16::from(b3));
            i += 3;
        } else {
            return Err(CodecError::InvalidUtf8);
        }
    }
    String::from_utf16(&units).map_err(|_| CodecError::InvalidUtf8)
}

fn continuation(bytes: &[u8], at: usize) -> CodecResult<u8> {
    match bytes.get(at) {
        Some(b) if b & 0xC0 == 0x80 => Ok(b & 0x3F),
        _ => Err(CodecError::InvalidUtf8),
    }
}
