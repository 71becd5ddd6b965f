//! Peer wire sessions end to end: chunking invariance, abort behavior,
//! and the framing round-trip law.

use bytes::Bytes;
use driftnet_core::config::{AnalyzerConfig, WireConfig};
use driftnet_core::events::{ErrorKind, Event, TracingSink, VecSink};
use driftnet_core::wire::types::PieceIndex;
use driftnet_core::wire::{Connection, Direction, MessageCodec, PeerMessage, PeerWireAnalyzer};
use proptest::prelude::*;

const PROTOCOL: &[u8] = b"BitTorrent protocol";

fn handshake_bytes() -> Vec<u8> {
    let mut buf = vec![0x13];
    buf.extend_from_slice(PROTOCOL);
    buf.extend_from_slice(&[0u8; 8]);
    buf.extend_from_slice(&[0xaa; 20]);
    buf.extend_from_slice(&[0xbb; 20]);
    buf
}

fn session_bytes(messages: &[PeerMessage]) -> Vec<u8> {
    let mut stream = handshake_bytes();
    for message in messages {
        stream.extend_from_slice(&MessageCodec::encode(message));
    }
    stream
}

fn run_in_chunks(stream: &[u8], chunk_sizes: &[usize]) -> Vec<Event> {
    let mut sink = VecSink::new();
    let mut analyzer =
        PeerWireAnalyzer::new(&AnalyzerConfig::default(), Direction::Originator);

    let mut rest = stream;
    let mut sizes = chunk_sizes.iter().copied().cycle();
    while !rest.is_empty() {
        let n = sizes.next().unwrap_or(1).clamp(1, rest.len());
        let (chunk, tail) = rest.split_at(n);
        analyzer.push(chunk, &mut sink);
        rest = tail;
    }
    analyzer.close(&mut sink);
    sink.take()
}

fn sample_session() -> Vec<PeerMessage> {
    vec![
        PeerMessage::Bitfield {
            bitfield: Bytes::from_static(&[0xff, 0x01]),
        },
        PeerMessage::Unchoke,
        PeerMessage::Interested,
        PeerMessage::Request {
            piece_index: PieceIndex::new(0),
            offset: 0,
            length: 16384,
        },
        PeerMessage::Piece {
            piece_index: PieceIndex::new(0),
            offset: 0,
            data: Bytes::from_static(b"sixteen bytes!!!"),
        },
        PeerMessage::KeepAlive,
        PeerMessage::Unknown {
            id: 20,
            payload: Bytes::from_static(b"\x00handshake payload"),
        },
        PeerMessage::Port { port: 6881 },
    ]
}

#[test]
fn whole_session_emits_one_event_per_unit() {
    let messages = sample_session();
    let events = run_in_chunks(&session_bytes(&messages), &[usize::MAX]);

    assert_eq!(events.len(), 1 + messages.len());
    assert!(matches!(events[0], Event::HandshakeSeen(_)));
    for (event, message) in events[1..].iter().zip(&messages) {
        let Event::PeerMessageSeen { message: seen, .. } = event else {
            panic!("expected message event, got {event:?}");
        };
        assert_eq!(seen, message);
    }
}

#[test]
fn one_byte_chunks_match_single_chunk() {
    let stream = session_bytes(&sample_session());
    let whole = run_in_chunks(&stream, &[usize::MAX]);
    let single = run_in_chunks(&stream, &[1]);
    assert_eq!(whole, single);
}

proptest! {
    #[test]
    fn chunking_never_changes_the_event_sequence(
        chunk_sizes in proptest::collection::vec(1usize..16, 1..32),
        messages in proptest::collection::vec(arb_message(), 0..12),
    ) {
        let stream = session_bytes(&messages);
        let whole = run_in_chunks(&stream, &[usize::MAX]);
        let chunked = run_in_chunks(&stream, &chunk_sizes);
        prop_assert_eq!(whole, chunked);
    }

    #[test]
    fn framing_round_trips(message in arb_message()) {
        let wire = MessageCodec::encode(&message);
        let declared = u32::from_be_bytes(wire[..4].try_into().unwrap());
        if declared == 0 {
            prop_assert_eq!(message, PeerMessage::KeepAlive);
        } else {
            let decoded = MessageCodec::decode(declared, &wire[4..]).unwrap();
            prop_assert_eq!(decoded, message);
        }
    }
}

fn arb_message() -> impl Strategy<Value = PeerMessage> {
    prop_oneof![
        Just(PeerMessage::KeepAlive),
        Just(PeerMessage::Choke),
        Just(PeerMessage::Unchoke),
        Just(PeerMessage::Interested),
        Just(PeerMessage::NotInterested),
        any::<u32>().prop_map(|index| PeerMessage::Have {
            piece_index: PieceIndex::new(index)
        }),
        proptest::collection::vec(any::<u8>(), 0..64).prop_map(|bits| PeerMessage::Bitfield {
            bitfield: Bytes::from(bits)
        }),
        (any::<u32>(), any::<u32>(), any::<u32>()).prop_map(|(index, offset, length)| {
            PeerMessage::Request {
                piece_index: PieceIndex::new(index),
                offset,
                length,
            }
        }),
        (
            any::<u32>(),
            any::<u32>(),
            proptest::collection::vec(any::<u8>(), 0..128)
        )
            .prop_map(|(index, offset, data)| PeerMessage::Piece {
                piece_index: PieceIndex::new(index),
                offset,
                data: Bytes::from(data),
            }),
        (any::<u32>(), any::<u32>(), any::<u32>()).prop_map(|(index, offset, length)| {
            PeerMessage::Cancel {
                piece_index: PieceIndex::new(index),
                offset,
                length,
            }
        }),
        any::<u16>().prop_map(|port| PeerMessage::Port { port }),
        (10u8..=255, proptest::collection::vec(any::<u8>(), 0..32)).prop_map(|(id, payload)| {
            PeerMessage::Unknown {
                id,
                payload: Bytes::from(payload),
            }
        }),
    ]
}

#[test]
fn oversized_frame_is_one_error_and_nothing_else() {
    let config = AnalyzerConfig {
        wire: WireConfig {
            max_frame_length: 256,
            ..WireConfig::default()
        },
        ..AnalyzerConfig::default()
    };

    let mut stream = handshake_bytes();
    stream.extend_from_slice(&257u32.to_be_bytes());
    stream.extend_from_slice(&[0x07; 1024]); // plenty of body bytes follow

    let mut sink = VecSink::new();
    let mut analyzer = PeerWireAnalyzer::new(&config, Direction::Responder);
    analyzer.push(&stream, &mut sink);
    analyzer.push(&[0x07; 1024], &mut sink);

    let events = sink.take();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Event::HandshakeSeen(_)));
    assert!(matches!(
        events[1],
        Event::ProtocolError {
            kind: ErrorKind::OversizedFrame,
            ..
        }
    ));
}

#[test]
fn both_directions_run_independently() {
    let config = AnalyzerConfig::default();
    let mut connection = Connection::new(&config);
    let mut sink = VecSink::new();

    let originator_stream = session_bytes(&[PeerMessage::Interested]);
    let responder_stream = session_bytes(&[PeerMessage::Unchoke]);

    // Interleave the two directions chunk by chunk.
    let originator_chunks: Vec<&[u8]> = originator_stream.chunks(7).collect();
    let responder_chunks: Vec<&[u8]> = responder_stream.chunks(5).collect();
    for i in 0..originator_chunks.len().max(responder_chunks.len()) {
        if let Some(chunk) = originator_chunks.get(i) {
            connection.originator.push(chunk, &mut sink);
        }
        if let Some(chunk) = responder_chunks.get(i) {
            connection.responder.push(chunk, &mut sink);
        }
    }

    let events = sink.take();
    let handshakes = events
        .iter()
        .filter(|e| matches!(e, Event::HandshakeSeen(_)))
        .count();
    let messages = events
        .iter()
        .filter(|e| matches!(e, Event::PeerMessageSeen { .. }))
        .count();
    assert_eq!(handshakes, 2);
    assert_eq!(messages, 2);
}

#[test]
fn tracing_sink_accepts_every_event() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();

    let mut sink = TracingSink;
    let mut analyzer =
        PeerWireAnalyzer::new(&AnalyzerConfig::default(), Direction::Originator);
    analyzer.push(&session_bytes(&sample_session()), &mut sink);
    analyzer.push(b"\x00\x00\x00", &mut sink); // incomplete header, silent
}
