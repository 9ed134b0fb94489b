//! Order-preserving serializers consumed by [`crate::tree::Tree`].
//!
//! A serializer turns a typed application key into the fixed-width bytes
//! the tree actually stores and compares, and back. Every variant here is
//! order-preserving: `a < b` on the typed value implies
//! `serialize(a) < serialize(b)` under plain byte compare, so the tree
//! never needs to know anything about the key's original type.

use crate::error::{TreeError, TreeResult};
use crate::serialization::codec;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Tag stored in the metadata page identifying which serializer a tree was
/// opened with, so a caller reopening the file can be warned about a
/// mismatched serializer instead of silently misreading keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum SerializerTag {
    Int = 0,
    Str = 1,
    Uuid = 2,
    DatetimeUtc = 3,
    CompositeKey = 4,
}

impl SerializerTag {
    pub fn from_u16(value: u16) -> TreeResult<Self> {
        match value {
            0 => Ok(SerializerTag::Int),
            1 => Ok(SerializerTag::Str),
            2 => Ok(SerializerTag::Uuid),
            3 => Ok(SerializerTag::DatetimeUtc),
            4 => Ok(SerializerTag::CompositeKey),
            other => Err(TreeError::corrupted(format!(
                "unknown serializer tag {other} in metadata page"
            ))),
        }
    }
}

/// A codec between a typed key and the fixed-width, order-preserving bytes
/// the tree stores.
pub trait Serializer {
    type Value: Clone;

    fn tag(&self) -> SerializerTag;

    /// Encode `value` into exactly `width` bytes.
    fn serialize(&self, value: &Self::Value, width: usize) -> TreeResult<Vec<u8>>;

    /// Decode a value previously produced by [`Serializer::serialize`].
    fn deserialize(&self, bytes: &[u8]) -> TreeResult<Self::Value>;
}

/// Signed 64-bit integers, encoded order-preservingly: the sign bit is
/// flipped before big-endian encoding so that byte compare matches signed
/// integer compare (negative values sort before positive ones).
#[derive(Debug, Clone, Copy, Default)]
pub struct IntSerializer;

impl Serializer for IntSerializer {
    type Value = i64;

    fn tag(&self) -> SerializerTag {
        SerializerTag::Int
    }

    fn serialize(&self, value: &i64, width: usize) -> TreeResult<Vec<u8>> {
        codec::encode_i64(*value, width)
    }

    fn deserialize(&self, bytes: &[u8]) -> TreeResult<i64> {
        Ok(codec::decode_i64(bytes))
    }
}

/// Unsigned 64-bit integers, naturally order-preserving as big-endian bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UIntSerializer;

impl Serializer for UIntSerializer {
    type Value = u64;

    fn tag(&self) -> SerializerTag {
        SerializerTag::Int
    }

    fn serialize(&self, value: &u64, width: usize) -> TreeResult<Vec<u8>> {
        codec::encode_u64(*value, width)
    }

    fn deserialize(&self, bytes: &[u8]) -> TreeResult<u64> {
        Ok(codec::decode_u64(bytes))
    }
}

/// UTF-8 strings, right-padded with `0x00` to `width`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrSerializer;

impl Serializer for StrSerializer {
    type Value = String;

    fn tag(&self) -> SerializerTag {
        SerializerTag::Str
    }

    fn serialize(&self, value: &String, width: usize) -> TreeResult<Vec<u8>> {
        codec::encode_str(value, width)
    }

    fn deserialize(&self, bytes: &[u8]) -> TreeResult<String> {
        codec::decode_str(bytes)
    }
}

/// Raw 16-byte UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSerializer;

impl Serializer for UuidSerializer {
    type Value = Uuid;

    fn tag(&self) -> SerializerTag {
        SerializerTag::Uuid
    }

    fn serialize(&self, value: &Uuid, width: usize) -> TreeResult<Vec<u8>> {
        codec::encode_uuid(value, width)
    }

    fn deserialize(&self, bytes: &[u8]) -> TreeResult<Uuid> {
        codec::decode_uuid(bytes)
    }
}

/// UTC timestamps, encoded as nanoseconds since the Unix epoch using the
/// same order-preserving signed encoding as [`IntSerializer`] (dates before
/// 1970 must still sort before dates after it).
#[derive(Debug, Clone, Copy, Default)]
pub struct DatetimeUtcSerializer;

impl Serializer for DatetimeUtcSerializer {
    type Value = DateTime<Utc>;

    fn tag(&self) -> SerializerTag {
        SerializerTag::DatetimeUtc
    }

    fn serialize(&self, value: &DateTime<Utc>, width: usize) -> TreeResult<Vec<u8>> {
        let nanos = value
            .timestamp_nanos_opt()
            .ok_or_else(|| TreeError::invalid_argument("datetime out of range for i64 nanos"))?;
        codec::encode_i64(nanos, width)
    }

    fn deserialize(&self, bytes: &[u8]) -> TreeResult<DateTime<Utc>> {
        let nanos = codec::decode_i64(bytes);
        DateTime::from_timestamp(
            nanos.div_euclid(1_000_000_000),
            (nanos.rem_euclid(1_000_000_000)) as u32,
        )
        .ok_or_else(|| TreeError::corrupted("datetime nanos out of range"))
    }
}
