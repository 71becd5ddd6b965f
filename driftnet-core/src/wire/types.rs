//! Core types for observed peer wire protocol traffic

use std::fmt;

use bytes::Bytes;
use serde::{Serialize, Serializer};

/// SHA-1 hash identifying a unique torrent.
///
/// 20-byte hash of a torrent's info dictionary, extracted verbatim from
/// handshakes and tracker messages. Identifies which swarm a connection
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash([u8; 20]);

impl InfoHash {
    /// Creates InfoHash from a 20-byte hash.
    pub fn new(hash: [u8; 20]) -> Self {
        Self(hash)
    }

    /// Creates InfoHash from a slice, if it is exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(bytes).ok().map(Self)
    }

    /// Returns reference to the underlying 20 bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for InfoHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

/// BitTorrent peer identifier.
///
/// 20-byte identifier presented by a peer in handshakes and announce
/// requests. Opaque bytes; clients embed vendor/version prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId([u8; 20]);

impl PeerId {
    /// Creates peer ID from a 20-byte array.
    pub fn new(id: [u8; 20]) -> Self {
        Self(id)
    }

    /// Creates peer ID from a slice, if it is exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(bytes).ok().map(Self)
    }

    /// Returns reference to the underlying 20 bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for PeerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

/// Zero-based index of a piece within a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PieceIndex(pub u32);

impl PieceIndex {
    /// Creates PieceIndex from zero-based index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the underlying piece index as u32.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PieceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observed peer handshake.
///
/// The fixed-format initial exchange on a peer wire connection. Immutable
/// once validated; the protocol name has already been checked against the
/// configured identifier by the time this record exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handshake {
    /// Protocol identifier string ("BitTorrent protocol")
    pub protocol: String,
    /// Reserved bytes carrying extension flag bits
    pub reserved: [u8; 8],
    /// Info hash of the torrent under discussion
    pub info_hash: InfoHash,
    /// Identifier the sending peer claims for itself
    pub peer_id: PeerId,
}

/// BitTorrent wire protocol messages as observed on a connection.
///
/// The BEP 3 message set plus a lossless `Unknown` fallback so protocol
/// extensions surface as events instead of parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerMessage {
    /// Zero-length frame keeping the connection alive
    KeepAlive,
    /// Sender is choking the receiver
    Choke,
    /// Sender is no longer choking the receiver
    Unchoke,
    /// Sender is interested in the receiver's pieces
    Interested,
    /// Sender is not interested in the receiver's pieces
    NotInterested,
    /// Sender has acquired a piece
    Have {
        /// Index of the newly acquired piece
        piece_index: PieceIndex,
    },
    /// Sender's complete piece availability bitmap
    Bitfield {
        /// Raw bitmap; bit-length is not validated against a piece
        /// count, which this layer does not know
        bitfield: Bytes,
    },
    /// Request for a block of piece data
    Request {
        /// Index of the piece requested from
        piece_index: PieceIndex,
        /// Byte offset within the piece
        offset: u32,
        /// Number of bytes requested
        length: u32,
    },
    /// A block of piece data
    Piece {
        /// Index of the piece this block belongs to
        piece_index: PieceIndex,
        /// Byte offset within the piece
        offset: u32,
        /// Block payload; length is whatever the frame declared minus
        /// the fixed fields, never a fixed block size
        data: Bytes,
    },
    /// Cancellation of a previously sent request
    Cancel {
        /// Index of the piece to cancel
        piece_index: PieceIndex,
        /// Byte offset within the piece
        offset: u32,
        /// Number of bytes that were requested
        length: u32,
    },
    /// The sender's DHT listen port
    Port {
        /// UDP port for DHT communication
        port: u16,
    },
    /// Message with an unrecognized id, preserved losslessly
    Unknown {
        /// Wire message id
        id: u8,
        /// Everything after the id byte, untouched
        payload: Bytes,
    },
}

/// Wire message ids per BEP 3.
pub mod message_id {
    pub const CHOKE: u8 = 0;
    pub const UNCHOKE: u8 = 1;
    pub const INTERESTED: u8 = 2;
    pub const NOT_INTERESTED: u8 = 3;
    pub const HAVE: u8 = 4;
    pub const BITFIELD: u8 = 5;
    pub const REQUEST: u8 = 6;
    pub const PIECE: u8 = 7;
    pub const CANCEL: u8 = 8;
    pub const PORT: u8 = 9;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_hash_display_is_hex() {
        let hash = InfoHash::new([0xab; 20]);
        assert_eq!(hash.to_string(), "ab".repeat(20));
    }

    #[test]
    fn test_from_slice_length_check() {
        assert!(InfoHash::from_slice(&[0u8; 20]).is_some());
        assert!(InfoHash::from_slice(&[0u8; 19]).is_none());
        assert!(PeerId::from_slice(&[0u8; 21]).is_none());
    }

    #[test]
    fn test_message_serializes_with_tag() {
        let message = PeerMessage::Have {
            piece_index: PieceIndex::new(7),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "have");
        assert_eq!(json["piece_index"], 7);
    }
}
