//! Bounded recursive-descent bencode decoder
//!
//! Decodes exactly one value from a byte slice and reports the offset
//! immediately following it. Every failure carries the offset at which
//! decoding stopped, so callers can scope error events to the offending
//! byte. Nesting depth and total node count are capped by configuration
//! because the input is attacker-influenced.

use std::collections::BTreeMap;

use bytes::Bytes;

use super::value::Value;
use crate::config::BencodeConfig;

/// Bencode syntax violations, each anchored to an input offset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BencodeError {
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("unexpected byte {byte:#04x} at offset {offset}")]
    UnexpectedByte { byte: u8, offset: usize },

    #[error("invalid integer at offset {offset}: {reason}")]
    InvalidInteger { offset: usize, reason: &'static str },

    #[error("invalid string length at offset {offset}")]
    InvalidLength { offset: usize },

    #[error("string of {declared} bytes at offset {offset} overruns remaining input")]
    TruncatedString { offset: usize, declared: usize },

    #[error("nesting depth limit {limit} exceeded at offset {offset}")]
    DepthExceeded { offset: usize, limit: usize },

    #[error("decoded value limit {limit} exceeded at offset {offset}")]
    TooManyValues { offset: usize, limit: usize },

    #[error("dictionary key at offset {offset} is not a byte string")]
    NonStringKey { offset: usize },

    #[error("dictionary keys out of order at offset {offset}")]
    KeyOrder { offset: usize },

    #[error("trailing data after value at offset {offset}")]
    TrailingData { offset: usize },
}

impl BencodeError {
    /// Input offset at which decoding failed.
    pub fn offset(&self) -> usize {
        match self {
            BencodeError::UnexpectedEof { offset }
            | BencodeError::UnexpectedByte { offset, .. }
            | BencodeError::InvalidInteger { offset, .. }
            | BencodeError::InvalidLength { offset }
            | BencodeError::TruncatedString { offset, .. }
            | BencodeError::DepthExceeded { offset, .. }
            | BencodeError::TooManyValues { offset, .. }
            | BencodeError::NonStringKey { offset }
            | BencodeError::KeyOrder { offset }
            | BencodeError::TrailingData { offset } => *offset,
        }
    }
}

/// A successfully decoded value plus decode metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub value: Value,
    /// Offset immediately past the decoded value
    pub consumed: usize,
    /// Offset of the first out-of-order or duplicate dictionary key,
    /// when lenient key ordering is configured
    pub key_order_violation: Option<usize>,
}

/// Decodes a complete document; trailing bytes are an error.
pub fn decode(input: &[u8], config: &BencodeConfig) -> Result<Decoded, BencodeError> {
    let decoded = decode_prefix(input, config)?;
    if decoded.consumed != input.len() {
        return Err(BencodeError::TrailingData {
            offset: decoded.consumed,
        });
    }
    Ok(decoded)
}

/// Decodes exactly one value from the start of the slice, leaving any
/// trailing bytes for the caller.
pub fn decode_prefix(input: &[u8], config: &BencodeConfig) -> Result<Decoded, BencodeError> {
    let mut decoder = Decoder {
        input,
        pos: 0,
        depth: 0,
        values: 0,
        config,
        key_order_violation: None,
    };
    let value = decoder.decode_value()?;
    Ok(Decoded {
        value,
        consumed: decoder.pos,
        key_order_violation: decoder.key_order_violation,
    })
}

struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
    values: usize,
    config: &'a BencodeConfig,
    key_order_violation: Option<usize>,
}

impl Decoder<'_> {
    fn peek(&self) -> Result<u8, BencodeError> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(BencodeError::UnexpectedEof { offset: self.pos })
    }

    fn bump_value_count(&mut self) -> Result<(), BencodeError> {
        self.values += 1;
        if self.values > self.config.max_values {
            return Err(BencodeError::TooManyValues {
                offset: self.pos,
                limit: self.config.max_values,
            });
        }
        Ok(())
    }

    fn decode_value(&mut self) -> Result<Value, BencodeError> {
        self.bump_value_count()?;

        match self.peek()? {
            b'i' => self.decode_integer(),
            b'l' => self.decode_list(),
            b'd' => self.decode_dict(),
            b'0'..=b'9' => self.decode_bytes().map(Value::Bytes),
            byte => Err(BencodeError::UnexpectedByte {
                byte,
                offset: self.pos,
            }),
        }
    }

    fn decode_integer(&mut self) -> Result<Value, BencodeError> {
        let token_start = self.pos;
        self.pos += 1; // 'i'

        let body_start = self.pos;
        if self.peek()? == b'-' {
            self.pos += 1;
        }

        let digits_start = self.pos;
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
            self.pos += 1;
        }

        if self.peek()? != b'e' {
            return Err(BencodeError::InvalidInteger {
                offset: token_start,
                reason: "non-digit in integer body",
            });
        }

        let digits = &self.input[digits_start..self.pos];
        if digits.is_empty() {
            return Err(BencodeError::InvalidInteger {
                offset: token_start,
                reason: "no digits",
            });
        }
        if digits.len() > 1 && digits[0] == b'0' {
            return Err(BencodeError::InvalidInteger {
                offset: token_start,
                reason: "leading zeros",
            });
        }
        if digits == b"0" && body_start != digits_start {
            return Err(BencodeError::InvalidInteger {
                offset: token_start,
                reason: "negative zero",
            });
        }

        // Sign included so i64::MIN parses.
        let body = std::str::from_utf8(&self.input[body_start..self.pos])
            .expect("integer body is ASCII by construction");
        let value: i64 = body.parse().map_err(|_| BencodeError::InvalidInteger {
            offset: token_start,
            reason: "out of range for i64",
        })?;

        self.pos += 1; // 'e'
        Ok(Value::Integer(value))
    }

    fn decode_bytes(&mut self) -> Result<Bytes, BencodeError> {
        let length_start = self.pos;
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
            self.pos += 1;
        }

        let digits = &self.input[length_start..self.pos];
        if digits.is_empty() || (digits.len() > 1 && digits[0] == b'0') {
            return Err(BencodeError::InvalidLength {
                offset: length_start,
            });
        }
        if self.peek()? != b':' {
            return Err(BencodeError::InvalidLength {
                offset: length_start,
            });
        }

        let length_str =
            std::str::from_utf8(digits).expect("length digits are ASCII by construction");
        let length: usize = length_str.parse().map_err(|_| BencodeError::InvalidLength {
            offset: length_start,
        })?;

        self.pos += 1; // ':'

        // Never allocate for a claimed length the buffer cannot back.
        if length > self.input.len() - self.pos {
            return Err(BencodeError::TruncatedString {
                offset: length_start,
                declared: length,
            });
        }

        let bytes = Bytes::copy_from_slice(&self.input[self.pos..self.pos + length]);
        self.pos += length;
        Ok(bytes)
    }

    fn enter_container(&mut self) -> Result<(), BencodeError> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            return Err(BencodeError::DepthExceeded {
                offset: self.pos,
                limit: self.config.max_depth,
            });
        }
        Ok(())
    }

    fn decode_list(&mut self) -> Result<Value, BencodeError> {
        self.enter_container()?;
        self.pos += 1; // 'l'

        let mut list = Vec::new();
        while self.peek()? != b'e' {
            list.push(self.decode_value()?);
        }

        self.pos += 1; // 'e'
        self.depth -= 1;
        Ok(Value::List(list))
    }

    fn decode_dict(&mut self) -> Result<Value, BencodeError> {
        self.enter_container()?;
        self.pos += 1; // 'd'

        let mut dict = BTreeMap::new();
        let mut prev_key: Option<Bytes> = None;

        while self.peek()? != b'e' {
            let key_offset = self.pos;
            if !self.input[self.pos].is_ascii_digit() {
                return Err(BencodeError::NonStringKey { offset: key_offset });
            }
            self.bump_value_count()?;
            let key = self.decode_bytes()?;

            // Canonical encoding orders keys strictly ascending; duplicates
            // violate it too. Soft-reported unless strict mode is on.
            if let Some(prev) = &prev_key
                && key <= *prev
            {
                if self.config.strict_key_order {
                    return Err(BencodeError::KeyOrder { offset: key_offset });
                }
                if self.key_order_violation.is_none() {
                    self.key_order_violation = Some(key_offset);
                }
            }
            prev_key = Some(key.clone());

            let value = self.decode_value()?;
            dict.insert(key, value);
        }

        self.pos += 1; // 'e'
        self.depth -= 1;
        Ok(Value::Dict(dict))
    }
}
