pub mod codec;
pub mod composite;
pub mod serializer;

#[cfg(test)]
mod serializer_test;

pub use composite::{Column, ColumnKind, ColumnValue, CompositeKey, CompositeKeySerializer};
pub use serializer::{
    DatetimeUtcSerializer, IntSerializer, Serializer, SerializerTag, StrSerializer, UIntSerializer,
    UuidSerializer,
};
