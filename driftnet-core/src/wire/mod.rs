//! Peer wire protocol analysis
//!
//! The binary, length-framed protocol spoken directly between two
//! BitTorrent clients. [`PeerWireAnalyzer`] consumes one direction of a
//! connection's byte stream in arbitrary chunks and emits one event per
//! completed handshake or message frame.

pub mod analyzer;
pub mod cursor;
pub mod handshake;
pub mod messages;
pub mod types;

pub use analyzer::{Connection, Direction, PeerWireAnalyzer};
pub use cursor::StreamCursor;
pub use handshake::HandshakeCodec;
pub use messages::MessageCodec;
pub use types::{Handshake, InfoHash, PeerId, PeerMessage, PieceIndex};

/// Errors raised while interpreting peer wire traffic.
///
/// Unknown message ids are deliberately not represented here; they are
/// preserved as [`PeerMessage::Unknown`] for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Handshake does not carry the expected protocol identifier; the
    /// connection is likely not BitTorrent.
    #[error("protocol mismatch: {detail}")]
    ProtocolMismatch { detail: String },

    /// Declared frame length exceeds the configured maximum. Buffering it
    /// would let a hostile peer claim a multi-gigabyte frame.
    #[error("declared frame length {declared} exceeds maximum {max}")]
    OversizedFrame { declared: u32, max: u32 },

    /// Declared frame length does not match the fixed field layout of the
    /// tagged message.
    #[error("message id {id} with invalid declared length {declared}")]
    MessageLength { id: u8, declared: u32 },
}
