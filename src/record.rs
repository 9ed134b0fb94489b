//! A thin fixed-width record layer on top of [`crate::tree::Tree`]'s raw
//! byte values, for callers that want named, typed columns in the value
//! slot without writing their own packing code. Deliberately stops here:
//! no query planner, no schema catalog, no joins.

use crate::error::{TreeError, TreeResult};
use crate::serialization::composite::ColumnKind;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One column's fixed width and type, used to pack and unpack a [`Row`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub kind: ColumnKind,
    pub width: usize,
}

impl FieldSpec {
    pub fn uint(width: usize) -> Self {
        FieldSpec { kind: ColumnKind::UInt, width }
    }

    pub fn str(width: usize) -> Self {
        FieldSpec { kind: ColumnKind::Str, width }
    }

    pub fn uuid() -> Self {
        FieldSpec { kind: ColumnKind::Uuid, width: 16 }
    }

    pub fn datetime_utc(width: usize) -> Self {
        FieldSpec { kind: ColumnKind::DatetimeUtc, width }
    }
}

/// A decoded record field.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    UInt(u64),
    Str(String),
    Uuid(Uuid),
    DatetimeUtc(DateTime<Utc>),
}

/// A fixed layout of [`FieldSpec`]s describing how to pack a row of
/// [`Field`]s into (and back out of) a tree value slot.
pub struct RowLayout {
    fields: Vec<FieldSpec>,
    value_size: usize,
}

impl RowLayout {
    pub fn new(fields: Vec<FieldSpec>) -> TreeResult<Self> {
        if fields.is_empty() {
            return Err(TreeError::invalid_argument("row layout needs at least one field"));
        }
        let value_size = fields.iter().map(|f| f.width).sum();
        Ok(RowLayout { fields, value_size })
    }

    pub fn value_size(&self) -> usize {
        self.value_size
    }

    /// Pack `fields` into the tree's fixed-width value bytes.
    pub fn pack(&self, fields: &[Field]) -> TreeResult<Vec<u8>> {
        if fields.len() != self.fields.len() {
            return Err(TreeError::invalid_argument(format!(
                "row has {} fields, layout expects {}",
                fields.len(),
                self.fields.len()
            )));
        }

        let mut out = Vec::with_capacity(self.value_size);
        for (field, spec) in fields.iter().zip(&self.fields) {
            let bytes = encode_field(field, spec)?;
            out.extend_from_slice(&bytes);
        }
        Ok(out)
    }

    /// Unpack a value slot previously produced by [`RowLayout::pack`].
    pub fn unpack(&self, bytes: &[u8]) -> TreeResult<Vec<Field>> {
        if bytes.len() != self.value_size {
            return Err(TreeError::corrupted(format!(
                "row is {} bytes, layout expects {}",
                bytes.len(),
                self.value_size
            )));
        }

        let mut out = Vec::with_capacity(self.fields.len());
        let mut offset = 0;
        for spec in &self.fields {
            let slice = &bytes[offset..offset + spec.width];
            out.push(decode_field(spec, slice)?);
            offset += spec.width;
        }
        Ok(out)
    }
}

fn encode_field(field: &Field, spec: &FieldSpec) -> TreeResult<Vec<u8>> {
    use crate::serialization::codec;

    match (field, spec.kind) {
        (Field::UInt(value), ColumnKind::UInt) => codec::encode_u64(*value, spec.width),
        (Field::Str(value), ColumnKind::Str) => codec::encode_str(value, spec.width),
        (Field::Uuid(value), ColumnKind::Uuid) => codec::encode_uuid(value, spec.width),
        (Field::DatetimeUtc(value), ColumnKind::DatetimeUtc) => {
            let nanos = value
                .timestamp_nanos_opt()
                .ok_or_else(|| TreeError::invalid_argument("datetime out of range for i64 nanos"))?;
            codec::encode_i64(nanos, spec.width)
        }
        _ => Err(TreeError::invalid_argument("field does not match column kind")),
    }
}

fn decode_field(spec: &FieldSpec, bytes: &[u8]) -> TreeResult<Field> {
    use crate::serialization::codec;

    match spec.kind {
        ColumnKind::UInt => Ok(Field::UInt(codec::decode_u64(bytes))),
        ColumnKind::Str => codec::decode_str(bytes).map(Field::Str),
        ColumnKind::Uuid => codec::decode_uuid(bytes).map(Field::Uuid),
        ColumnKind::DatetimeUtc => {
            let nanos = codec::decode_i64(bytes);
            DateTime::from_timestamp(
                nanos.div_euclid(1_000_000_000),
                (nanos.rem_euclid(1_000_000_000)) as u32,
            )
            .map(Field::DatetimeUtc)
            .ok_or_else(|| TreeError::corrupted("datetime nanos out of range"))
        }
    }
}
