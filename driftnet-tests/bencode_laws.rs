//! Laws the bencode codec guarantees: canonical encoding round-trips,
//! re-encoding is idempotent, and decoding never escapes its bounds.

use bytes::Bytes;
use driftnet_core::bencode::{BencodeError, Value, decode, decode_prefix, encode};
use driftnet_core::config::BencodeConfig;
use proptest::prelude::*;

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Value::Integer),
        proptest::collection::vec(any::<u8>(), 0..24)
            .prop_map(|bytes| Value::Bytes(Bytes::from(bytes))),
    ];
    leaf.prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            proptest::collection::btree_map(
                proptest::collection::vec(any::<u8>(), 0..8).prop_map(Bytes::from),
                inner,
                0..4,
            )
            .prop_map(Value::Dict),
        ]
    })
}

proptest! {
    #[test]
    fn canonical_encoding_round_trips(value in arb_value()) {
        let config = BencodeConfig::default();
        let wire = encode(&value);
        let decoded = decode(&wire, &config).unwrap();

        prop_assert_eq!(decoded.value, value);
        prop_assert_eq!(decoded.consumed, wire.len());
        // BTreeMap keys come out sorted, so canonical output never
        // triggers the order check.
        prop_assert_eq!(decoded.key_order_violation, None);
    }

    #[test]
    fn reencoding_a_decoded_value_is_idempotent(value in arb_value()) {
        let config = BencodeConfig::default();
        let first = encode(&value);
        let second = encode(&decode(&first, &config).unwrap().value);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let config = BencodeConfig::default();
        match decode_prefix(&bytes, &config) {
            Ok(decoded) => {
                prop_assert!(decoded.consumed <= bytes.len());
                // Whatever decoded must survive a canonical round trip.
                let canonical = encode(&decoded.value);
                let again = decode(&canonical, &config).unwrap();
                prop_assert_eq!(again.value, decoded.value);
            }
            Err(err) => prop_assert!(err.offset() <= bytes.len()),
        }
    }
}

#[test]
fn depth_limit_stops_nested_lists() {
    let config = BencodeConfig {
        max_depth: 8,
        ..BencodeConfig::default()
    };
    let mut input = Vec::new();
    input.extend(std::iter::repeat_n(b'l', 9));
    input.extend(std::iter::repeat_n(b'e', 9));

    let err = decode(&input, &config).unwrap_err();
    assert!(matches!(err, BencodeError::DepthExceeded { limit: 8, .. }));
}

#[test]
fn value_limit_stops_wide_lists() {
    let config = BencodeConfig {
        max_values: 4,
        ..BencodeConfig::default()
    };

    let err = decode(b"li1ei2ei3ei4ee", &config).unwrap_err();
    assert!(matches!(err, BencodeError::TooManyValues { limit: 4, .. }));
}

#[test]
fn decode_prefix_reports_consumed_offset() {
    let config = BencodeConfig::default();
    let decoded = decode_prefix(b"i42etrailing", &config).unwrap();
    assert_eq!(decoded.value, Value::Integer(42));
    assert_eq!(decoded.consumed, 4);

    let err = decode(b"i42etrailing", &config).unwrap_err();
    assert_eq!(err, BencodeError::TrailingData { offset: 4 });
}

#[test]
fn strict_ordering_only_changes_dict_acceptance() {
    let out_of_order = b"d1:bi1e1:ai2ee";

    let lenient = BencodeConfig::default();
    let decoded = decode(out_of_order, &lenient).unwrap();
    assert!(decoded.key_order_violation.is_some());

    let strict = BencodeConfig {
        strict_key_order: true,
        ..BencodeConfig::default()
    };
    assert!(matches!(
        decode(out_of_order, &strict),
        Err(BencodeError::KeyOrder { .. })
    ));
}
