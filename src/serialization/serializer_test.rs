#[cfg(test)]
mod tests {
    use crate::serialization::serializer::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn int_serializer_round_trips() {
        let s = IntSerializer;
        for value in [-100i64, -1, 0, 1, 100, i64::MIN, i64::MAX] {
            let bytes = s.serialize(&value, 8).unwrap();
            assert_eq!(bytes.len(), 8);
            assert_eq!(s.deserialize(&bytes).unwrap(), value);
        }
    }

    #[test]
    fn int_serializer_is_order_preserving() {
        let s = IntSerializer;
        let a = s.serialize(&-5, 8).unwrap();
        let b = s.serialize(&0, 8).unwrap();
        let c = s.serialize(&5, 8).unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn uint_serializer_round_trips() {
        let s = UIntSerializer;
        let bytes = s.serialize(&42u64, 8).unwrap();
        assert_eq!(s.deserialize(&bytes).unwrap(), 42);
    }

    #[test]
    fn str_serializer_pads_and_trims() {
        let s = StrSerializer;
        let bytes = s.serialize(&"ab".to_string(), 8).unwrap();
        assert_eq!(bytes.len(), 8);
        assert_eq!(s.deserialize(&bytes).unwrap(), "ab");
    }

    #[test]
    fn str_serializer_preserves_prefix_ordering() {
        let s = StrSerializer;
        let ab = s.serialize(&"ab".to_string(), 8).unwrap();
        let abc = s.serialize(&"abc".to_string(), 8).unwrap();
        assert!(ab < abc);
    }

    #[test]
    fn str_serializer_rejects_oversized_values() {
        let s = StrSerializer;
        assert!(s.serialize(&"too long".to_string(), 4).is_err());
    }

    #[test]
    fn uuid_serializer_round_trips() {
        let s = UuidSerializer;
        let id = Uuid::new_v4();
        let bytes = s.serialize(&id, 16).unwrap();
        assert_eq!(s.deserialize(&bytes).unwrap(), id);
    }

    #[test]
    fn datetime_serializer_round_trips_and_orders() {
        let s = DatetimeUtcSerializer;
        let earlier = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let a = s.serialize(&earlier, 8).unwrap();
        let b = s.serialize(&later, 8).unwrap();
        assert!(a < b);
        assert_eq!(s.deserialize(&a).unwrap(), earlier);
    }

    #[test]
    fn serializer_tag_round_trips() {
        for tag in [
            SerializerTag::Int,
            SerializerTag::Str,
            SerializerTag::Uuid,
            SerializerTag::DatetimeUtc,
            SerializerTag::CompositeKey,
        ] {
            assert_eq!(SerializerTag::from_u16(tag as u16).unwrap(), tag);
        }
        assert!(SerializerTag::from_u16(99).is_err());
    }
}
