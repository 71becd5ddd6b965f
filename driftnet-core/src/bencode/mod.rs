//! Bencode decoding and canonical encoding
//!
//! The self-describing serialization format used throughout the
//! BitTorrent ecosystem: integers, byte strings, lists, and dictionaries.
//! The decoder is bounded (nesting depth, node count) and reports failure
//! offsets; see [`crate::config::BencodeConfig`] for the limits.

pub mod decode;
pub mod encode;
pub mod value;

pub use decode::{BencodeError, Decoded, decode, decode_prefix};
pub use encode::encode;
pub use value::Value;
