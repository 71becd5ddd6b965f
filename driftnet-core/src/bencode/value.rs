//! Decoded bencode value representation

use std::collections::BTreeMap;

use bytes::Bytes;

/// A single decoded bencode value.
///
/// Byte strings are kept as raw bytes because protocol fields such as
/// info-hashes and compact peer lists are not UTF-8. Dictionaries use a
/// `BTreeMap` so canonical re-encoding gets sorted keys for free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `i<digits>e`
    Integer(i64),
    /// `<length>:<bytes>`
    Bytes(Bytes),
    /// `l...e`
    List(Vec<Value>),
    /// `d...e`, keyed by byte string
    Dict(BTreeMap<Bytes, Value>),
}

impl Value {
    /// Returns the integer value, if this is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the raw bytes, if this is a byte string.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the byte string as UTF-8, if this is one and it decodes.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// Returns the element slice, if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Returns the key/value map, if this is a dictionary.
    pub fn as_dict(&self) -> Option<&BTreeMap<Bytes, Value>> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Looks up a dictionary entry by raw key.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict().and_then(|dict| dict.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_match_variant() {
        let value = Value::Integer(42);
        assert_eq!(value.as_integer(), Some(42));
        assert!(value.as_bytes().is_none());

        let value = Value::Bytes(Bytes::from_static(b"spam"));
        assert_eq!(value.as_str(), Some("spam"));
        assert!(value.as_list().is_none());
    }

    #[test]
    fn test_dict_get() {
        let mut dict = BTreeMap::new();
        dict.insert(Bytes::from_static(b"interval"), Value::Integer(1800));
        let value = Value::Dict(dict);

        assert_eq!(value.get(b"interval").and_then(Value::as_integer), Some(1800));
        assert!(value.get(b"peers").is_none());
    }

    #[test]
    fn test_non_utf8_bytes_have_no_str_view() {
        let value = Value::Bytes(Bytes::from_static(&[0xff, 0xfe]));
        assert!(value.as_str().is_none());
        assert_eq!(value.as_bytes().unwrap().as_ref(), &[0xff, 0xfe]);
    }
}
