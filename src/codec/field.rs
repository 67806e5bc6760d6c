//! Fixed-width text fields.
//!
//! Every string on the wire occupies a constant number of bytes: the UTF-8
//! text starting at offset 0, followed by zero padding. A string that fills
//! the field exactly has no terminator.

use super::CodecError;

/// Encode `text` into a zero-padded buffer of exactly `max_bytes` bytes.
///
/// Oversized text is rejected, never truncated, so a multi-byte character can
/// never be cut in half.
pub fn encode_fixed_field(text: &str, max_bytes: usize) -> Result<Vec<u8>, CodecError> {
    let bytes = text.as_bytes();
    if bytes.len() > max_bytes {
        return Err(CodecError::FieldTooLong {
            len: bytes.len(),
            max: max_bytes,
        });
    }
    let mut field = vec![0u8; max_bytes];
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(field)
}

/// Decode a fixed-width field.
///
/// Reads up to the first zero byte, or the whole buffer if there is none.
pub fn decode_fixed_field(field: &[u8]) -> Result<String, CodecError> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end])
        .map(str::to_string)
        .map_err(|_| CodecError::InvalidUtf8)
}
