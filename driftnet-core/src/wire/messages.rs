//! Wire protocol message serialization and deserialization

use bytes::{Buf, BufMut, Bytes};

use super::WireError;
use super::types::{PeerMessage, PieceIndex, message_id};

/// Message serialization utilities for the BitTorrent wire protocol.
pub struct MessageCodec;

impl MessageCodec {
    /// Serializes a peer message with full wire framing following BEP 3.
    ///
    /// Decoding the result reproduces the message exactly; for `Unknown`
    /// the id and raw payload round-trip.
    pub fn encode(message: &PeerMessage) -> Vec<u8> {
        let mut buf = Vec::new();

        match message {
            PeerMessage::KeepAlive => {
                buf.put_u32(0); // Length = 0
            }
            PeerMessage::Choke => {
                buf.put_u32(1); // Length = 1
                buf.put_u8(message_id::CHOKE);
            }
            PeerMessage::Unchoke => {
                buf.put_u32(1);
                buf.put_u8(message_id::UNCHOKE);
            }
            PeerMessage::Interested => {
                buf.put_u32(1);
                buf.put_u8(message_id::INTERESTED);
            }
            PeerMessage::NotInterested => {
                buf.put_u32(1);
                buf.put_u8(message_id::NOT_INTERESTED);
            }
            PeerMessage::Have { piece_index } => {
                buf.put_u32(5); // Length = 1 + 4
                buf.put_u8(message_id::HAVE);
                buf.put_u32(piece_index.as_u32());
            }
            PeerMessage::Bitfield { bitfield } => {
                buf.put_u32(1 + bitfield.len() as u32);
                buf.put_u8(message_id::BITFIELD);
                buf.extend_from_slice(bitfield);
            }
            PeerMessage::Request {
                piece_index,
                offset,
                length,
            } => {
                buf.put_u32(13); // Length = 1 + 4 + 4 + 4
                buf.put_u8(message_id::REQUEST);
                buf.put_u32(piece_index.as_u32());
                buf.put_u32(*offset);
                buf.put_u32(*length);
            }
            PeerMessage::Piece {
                piece_index,
                offset,
                data,
            } => {
                buf.put_u32(9 + data.len() as u32); // Length = 1 + 4 + 4 + data.len()
                buf.put_u8(message_id::PIECE);
                buf.put_u32(piece_index.as_u32());
                buf.put_u32(*offset);
                buf.extend_from_slice(data);
            }
            PeerMessage::Cancel {
                piece_index,
                offset,
                length,
            } => {
                buf.put_u32(13);
                buf.put_u8(message_id::CANCEL);
                buf.put_u32(piece_index.as_u32());
                buf.put_u32(*offset);
                buf.put_u32(*length);
            }
            PeerMessage::Port { port } => {
                buf.put_u32(3); // Length = 1 + 2
                buf.put_u8(message_id::PORT);
                buf.put_u16(*port);
            }
            PeerMessage::Unknown { id, payload } => {
                buf.put_u32(1 + payload.len() as u32);
                buf.put_u8(*id);
                buf.extend_from_slice(payload);
            }
        }

        buf
    }

    /// Deserializes a message body whose frame declared `length` bytes.
    ///
    /// The caller has already consumed the 4-byte length prefix and
    /// collected exactly `length` body bytes; the first is the message id.
    /// Unrecognized ids become [`PeerMessage::Unknown`] rather than errors.
    ///
    /// # Errors
    ///
    /// - `WireError::MessageLength` - Declared length does not match the
    ///   fixed field layout for the id
    pub fn decode(length: u32, body: &[u8]) -> Result<PeerMessage, WireError> {
        debug_assert_eq!(body.len(), length as usize);

        let mut buf = body;
        let id = buf.get_u8();

        match id {
            message_id::CHOKE => Self::fixed(id, length, 1, PeerMessage::Choke),
            message_id::UNCHOKE => Self::fixed(id, length, 1, PeerMessage::Unchoke),
            message_id::INTERESTED => Self::fixed(id, length, 1, PeerMessage::Interested),
            message_id::NOT_INTERESTED => Self::fixed(id, length, 1, PeerMessage::NotInterested),
            message_id::HAVE => {
                if length != 5 {
                    return Err(WireError::MessageLength {
                        id,
                        declared: length,
                    });
                }
                Ok(PeerMessage::Have {
                    piece_index: PieceIndex::new(buf.get_u32()),
                })
            }
            message_id::BITFIELD => Ok(PeerMessage::Bitfield {
                bitfield: Bytes::copy_from_slice(buf),
            }),
            message_id::REQUEST => {
                if length != 13 {
                    return Err(WireError::MessageLength {
                        id,
                        declared: length,
                    });
                }
                Ok(PeerMessage::Request {
                    piece_index: PieceIndex::new(buf.get_u32()),
                    offset: buf.get_u32(),
                    length: buf.get_u32(),
                })
            }
            message_id::PIECE => {
                if length < 9 {
                    return Err(WireError::MessageLength {
                        id,
                        declared: length,
                    });
                }
                Ok(PeerMessage::Piece {
                    piece_index: PieceIndex::new(buf.get_u32()),
                    offset: buf.get_u32(),
                    // Remaining length - 9 bytes are the block, whatever
                    // size the sender chose
                    data: Bytes::copy_from_slice(buf),
                })
            }
            message_id::CANCEL => {
                if length != 13 {
                    return Err(WireError::MessageLength {
                        id,
                        declared: length,
                    });
                }
                Ok(PeerMessage::Cancel {
                    piece_index: PieceIndex::new(buf.get_u32()),
                    offset: buf.get_u32(),
                    length: buf.get_u32(),
                })
            }
            message_id::PORT => {
                if length != 3 {
                    return Err(WireError::MessageLength {
                        id,
                        declared: length,
                    });
                }
                Ok(PeerMessage::Port {
                    port: buf.get_u16(),
                })
            }
            _ => Ok(PeerMessage::Unknown {
                id,
                payload: Bytes::copy_from_slice(buf),
            }),
        }
    }

    fn fixed(
        id: u8,
        declared: u32,
        expected: u32,
        message: PeerMessage,
    ) -> Result<PeerMessage, WireError> {
        if declared != expected {
            return Err(WireError::MessageLength { id, declared });
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(message: PeerMessage) {
        let wire = MessageCodec::encode(&message);
        let declared = u32::from_be_bytes(wire[..4].try_into().unwrap());
        assert_eq!(wire.len(), 4 + declared as usize);
        if declared == 0 {
            assert_eq!(message, PeerMessage::KeepAlive);
            return;
        }
        let decoded = MessageCodec::decode(declared, &wire[4..]).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_round_trip_all_variants() {
        round_trip(PeerMessage::KeepAlive);
        round_trip(PeerMessage::Choke);
        round_trip(PeerMessage::Unchoke);
        round_trip(PeerMessage::Interested);
        round_trip(PeerMessage::NotInterested);
        round_trip(PeerMessage::Have {
            piece_index: PieceIndex::new(42),
        });
        round_trip(PeerMessage::Bitfield {
            bitfield: Bytes::from_static(&[0b1010_0001, 0x80]),
        });
        round_trip(PeerMessage::Request {
            piece_index: PieceIndex::new(3),
            offset: 16384,
            length: 16384,
        });
        round_trip(PeerMessage::Piece {
            piece_index: PieceIndex::new(3),
            offset: 16384,
            data: Bytes::from_static(b"block data of arbitrary size"),
        });
        round_trip(PeerMessage::Cancel {
            piece_index: PieceIndex::new(3),
            offset: 16384,
            length: 16384,
        });
        round_trip(PeerMessage::Port { port: 6881 });
        round_trip(PeerMessage::Unknown {
            id: 20,
            payload: Bytes::from_static(b"\x00d1:md11:ut_metadatai1eee"),
        });
    }

    #[test]
    fn test_single_byte_state_messages() {
        let decoded = MessageCodec::decode(1, &[message_id::INTERESTED]).unwrap();
        assert_eq!(decoded, PeerMessage::Interested);
        let decoded = MessageCodec::decode(1, &[message_id::NOT_INTERESTED]).unwrap();
        assert_eq!(decoded, PeerMessage::NotInterested);
    }

    #[test]
    fn test_empty_bitfield_payload_allowed() {
        let decoded = MessageCodec::decode(1, &[message_id::BITFIELD]).unwrap();
        assert_eq!(
            decoded,
            PeerMessage::Bitfield {
                bitfield: Bytes::new()
            }
        );
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let body = [message_id::HAVE, 0, 0, 0, 1, 0xff];
        let err = MessageCodec::decode(6, &body).unwrap_err();
        assert_eq!(
            err,
            WireError::MessageLength {
                id: message_id::HAVE,
                declared: 6
            }
        );

        let err = MessageCodec::decode(2, &[message_id::CHOKE, 0]).unwrap_err();
        assert_eq!(
            err,
            WireError::MessageLength {
                id: message_id::CHOKE,
                declared: 2
            }
        );

        let err = MessageCodec::decode(5, &[message_id::PIECE, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(
            err,
            WireError::MessageLength {
                id: message_id::PIECE,
                declared: 5
            }
        );
    }

    #[test]
    fn test_unknown_id_preserved() {
        let body = [42u8, 0xde, 0xad, 0xbe, 0xef];
        let decoded = MessageCodec::decode(5, &body).unwrap();
        assert_eq!(
            decoded,
            PeerMessage::Unknown {
                id: 42,
                payload: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
            }
        );
    }

    #[test]
    fn test_piece_payload_is_variable() {
        for block in [0usize, 1, 7, 16384] {
            let message = PeerMessage::Piece {
                piece_index: PieceIndex::new(0),
                offset: 0,
                data: Bytes::from(vec![0xaa; block]),
            };
            round_trip(message);
        }
    }
}
