//! BitTorrent handshake serialization and validation

use super::WireError;
use super::types::{Handshake, InfoHash, PeerId};

/// Fixed trailer after the protocol name: reserved + info-hash + peer-id.
const TRAILER_LEN: usize = 8 + 20 + 20;

/// Total handshake length for a protocol name of the given length.
pub fn handshake_len(protocol_name_len: usize) -> usize {
    1 + protocol_name_len + TRAILER_LEN
}

/// Handshake serialization utilities for the BitTorrent wire protocol.
pub struct HandshakeCodec;

impl HandshakeCodec {
    /// Serializes a handshake following BEP 3.
    pub fn encode(handshake: &Handshake) -> Vec<u8> {
        let mut buf = Vec::with_capacity(handshake_len(handshake.protocol.len()));
        buf.push(handshake.protocol.len() as u8);
        buf.extend_from_slice(handshake.protocol.as_bytes());
        buf.extend_from_slice(&handshake.reserved);
        buf.extend_from_slice(handshake.info_hash.as_bytes());
        buf.extend_from_slice(handshake.peer_id.as_bytes());
        buf
    }

    /// Deserializes and validates a handshake against the expected
    /// protocol identifier.
    ///
    /// `data` must be exactly `handshake_len(expected_protocol.len())`
    /// bytes; the analyzer only calls this once that many bytes are
    /// available.
    ///
    /// # Errors
    ///
    /// - `WireError::ProtocolMismatch` - Wrong name length byte, wrong
    ///   name bytes, or a short buffer
    pub fn decode(data: &[u8], expected_protocol: &str) -> Result<Handshake, WireError> {
        let expected = expected_protocol.as_bytes();
        if data.len() < handshake_len(expected.len()) {
            return Err(WireError::ProtocolMismatch {
                detail: format!("handshake truncated at {} bytes", data.len()),
            });
        }

        let name_len = data[0] as usize;
        if name_len != expected.len() {
            return Err(WireError::ProtocolMismatch {
                detail: format!(
                    "protocol name length {name_len}, expected {}",
                    expected.len()
                ),
            });
        }

        let name = &data[1..1 + name_len];
        if name != expected {
            return Err(WireError::ProtocolMismatch {
                detail: format!("protocol name {:?}", String::from_utf8_lossy(name)),
            });
        }

        let rest = &data[1 + name_len..];
        let mut reserved = [0u8; 8];
        reserved.copy_from_slice(&rest[..8]);

        let info_hash = InfoHash::from_slice(&rest[8..28]).expect("slice is 20 bytes");
        let peer_id = PeerId::from_slice(&rest[28..48]).expect("slice is 20 bytes");

        Ok(Handshake {
            protocol: expected_protocol.to_string(),
            reserved,
            info_hash,
            peer_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROTOCOL: &str = "BitTorrent protocol";

    fn wire_handshake(info_hash: &[u8; 20], peer_id: &[u8; 20]) -> Vec<u8> {
        let mut buf = vec![0x13];
        buf.extend_from_slice(PROTOCOL.as_bytes());
        buf.extend_from_slice(&[0u8; 8]);
        buf.extend_from_slice(info_hash);
        buf.extend_from_slice(peer_id);
        buf
    }

    #[test]
    fn test_decode_extracts_fields_verbatim() {
        let info_hash = *b"INFOHASH20B_________";
        let peer_id = *b"PEERID_____20B______";
        let data = wire_handshake(&info_hash, &peer_id);
        assert_eq!(data.len(), 68);

        let handshake = HandshakeCodec::decode(&data, PROTOCOL).unwrap();
        assert_eq!(handshake.protocol, PROTOCOL);
        assert_eq!(handshake.reserved, [0u8; 8]);
        assert_eq!(handshake.info_hash.as_bytes(), &info_hash);
        assert_eq!(handshake.peer_id.as_bytes(), &peer_id);
    }

    #[test]
    fn test_encode_round_trips() {
        let data = wire_handshake(&[0x11; 20], &[0x22; 20]);
        let handshake = HandshakeCodec::decode(&data, PROTOCOL).unwrap();
        assert_eq!(HandshakeCodec::encode(&handshake), data);
    }

    #[test]
    fn test_wrong_name_length_rejected() {
        let mut data = wire_handshake(&[0u8; 20], &[0u8; 20]);
        data[0] = 0x12;
        let err = HandshakeCodec::decode(&data, PROTOCOL).unwrap_err();
        assert!(matches!(err, WireError::ProtocolMismatch { .. }));
    }

    #[test]
    fn test_wrong_name_rejected() {
        let mut data = wire_handshake(&[0u8; 20], &[0u8; 20]);
        data[1..20].copy_from_slice(b"bitTorrent Protocol");
        let err = HandshakeCodec::decode(&data, PROTOCOL).unwrap_err();
        assert!(matches!(err, WireError::ProtocolMismatch { .. }));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let data = wire_handshake(&[0u8; 20], &[0u8; 20]);
        let err = HandshakeCodec::decode(&data[..40], PROTOCOL).unwrap_err();
        assert!(matches!(err, WireError::ProtocolMismatch { .. }));
    }

    #[test]
    fn test_reserved_bits_preserved() {
        let mut data = wire_handshake(&[0u8; 20], &[0u8; 20]);
        data[20..28].copy_from_slice(&[0, 0, 0, 0, 0, 0x10, 0, 0x05]);
        let handshake = HandshakeCodec::decode(&data, PROTOCOL).unwrap();
        assert_eq!(handshake.reserved, [0, 0, 0, 0, 0, 0x10, 0, 0x05]);
    }
}
