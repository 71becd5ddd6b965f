//! Canonical bencode encoder
//!
//! Emits the canonical form: dictionary keys in ascending byte order
//! (guaranteed by the `BTreeMap` representation) and integers without
//! leading zeros. Used by tests for the round-trip laws and by consumers
//! that need to re-serialize captured values.

use super::value::Value;

/// Encodes a value into its canonical bencode form.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Integer(n) => {
            out.push(b'i');
            out.extend_from_slice(n.to_string().as_bytes());
            out.push(b'e');
        }
        Value::Bytes(bytes) => {
            out.extend_from_slice(bytes.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(bytes);
        }
        Value::List(list) => {
            out.push(b'l');
            for item in list {
                encode_into(item, out);
            }
            out.push(b'e');
        }
        Value::Dict(dict) => {
            out.push(b'd');
            for (key, item) in dict {
                out.extend_from_slice(key.len().to_string().as_bytes());
                out.push(b':');
                out.extend_from_slice(key);
                encode_into(item, out);
            }
            out.push(b'e');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::decode::decode;
    use super::*;
    use crate::config::BencodeConfig;

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode(&Value::Integer(42)), b"i42e");
        assert_eq!(encode(&Value::Integer(-13)), b"i-13e");
        assert_eq!(
            encode(&Value::Bytes(bytes::Bytes::from_static(b"spam"))),
            b"4:spam"
        );
    }

    #[test]
    fn test_encode_sorts_dict_keys() {
        // Built from input with keys already sorted; map iteration keeps them so.
        let config = BencodeConfig::default();
        let decoded = decode(b"d3:bar4:spam3:fooi42ee", &config).unwrap();
        assert_eq!(encode(&decoded.value), b"d3:bar4:spam3:fooi42ee");
    }

    #[test]
    fn test_canonicalization_is_idempotent() {
        let config = BencodeConfig::default();
        // Out-of-order input: decoding and re-encoding yields canonical order.
        let decoded = decode(b"d3:fooi42e3:bar4:spame", &config).unwrap();
        let canonical = encode(&decoded.value);
        assert_eq!(canonical, b"d3:bar4:spam3:fooi42ee");

        let redecoded = decode(&canonical, &config).unwrap();
        assert_eq!(redecoded.value, decoded.value);
        assert!(redecoded.key_order_violation.is_none());
        assert_eq!(encode(&redecoded.value), canonical);
    }
}
