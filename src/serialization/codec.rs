use crate::error::{TreeError, TreeResult};

/// Encode an unsigned integer into a fixed `width`, left-padded with zero
/// bytes. Big-endian, so byte compare already matches integer compare.
pub fn encode_u64(value: u64, width: usize) -> TreeResult<Vec<u8>> {
    let full = value.to_be_bytes();
    if width > full.len() {
        let mut out = vec![0u8; width - full.len()];
        out.extend_from_slice(&full);
        return Ok(out);
    }
    let used = &full[full.len() - width..];
    if full[..full.len() - width].iter().any(|&b| b != 0) {
        return Err(TreeError::invalid_argument(format!(
            "value {value} does not fit in {width} bytes"
        )));
    }
    Ok(used.to_vec())
}

pub fn decode_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let start = 8usize.saturating_sub(bytes.len());
    let take = bytes.len().min(8);
    buf[start..].copy_from_slice(&bytes[bytes.len() - take..]);
    u64::from_be_bytes(buf)
}

/// Encode a signed integer order-preservingly: flip the sign bit so that
/// the big-endian byte order of the flipped value matches signed integer
/// order (negative numbers sort before positive ones).
pub fn encode_i64(value: i64, width: usize) -> TreeResult<Vec<u8>> {
    let flipped = (value as u64) ^ (1u64 << 63);
    encode_u64(flipped, width)
}

pub fn decode_i64(bytes: &[u8]) -> i64 {
    let flipped = decode_u64(bytes);
    (flipped ^ (1u64 << 63)) as i64
}

/// Encode a UTF-8 string into exactly `width` bytes, right-padded with
/// `0x00`. Padding with the lowest byte value keeps a prefix relationship
/// order-preserving: `"ab" < "abc"` still holds after padding both to width.
pub fn encode_str(value: &str, width: usize) -> TreeResult<Vec<u8>> {
    let raw = value.as_bytes();
    if raw.len() > width {
        return Err(TreeError::invalid_argument(format!(
            "string of {} bytes does not fit in {width} bytes",
            raw.len()
        )));
    }
    let mut out = vec![0u8; width];
    out[..raw.len()].copy_from_slice(raw);
    Ok(out)
}

pub fn decode_str(bytes: &[u8]) -> TreeResult<String> {
    let trimmed_len = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8(bytes[..trimmed_len].to_vec())
        .map_err(|e| TreeError::corrupted(format!("invalid UTF-8 in encoded string: {e}")))
}

/// Encode a UUID into its raw 16-byte form. `width` must be exactly 16;
/// UUIDs have no shorter order-preserving representation.
pub fn encode_uuid(value: &uuid::Uuid, width: usize) -> TreeResult<Vec<u8>> {
    if width != 16 {
        return Err(TreeError::invalid_argument(format!(
            "UUID columns must be 16 bytes wide, got {width}"
        )));
    }
    Ok(value.as_bytes().to_vec())
}

pub fn decode_uuid(bytes: &[u8]) -> TreeResult<uuid::Uuid> {
    let array: [u8; 16] = bytes
        .try_into()
        .map_err(|_| TreeError::corrupted("UUID field is not 16 bytes"))?;
    Ok(uuid::Uuid::from_bytes(array))
}
