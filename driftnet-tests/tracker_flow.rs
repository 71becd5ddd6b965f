//! Tracker announce/scrape exchanges through the analyzer, including the
//! percent-encoded binary fields and both peer list formats.

use driftnet_core::config::{AnalyzerConfig, BencodeConfig};
use driftnet_core::events::{ErrorKind, Event, VecSink};
use driftnet_core::tracker::{AnnounceEvent, TrackerAnalyzer, TrackerResponse};

fn analyzer() -> TrackerAnalyzer {
    TrackerAnalyzer::new(&AnalyzerConfig::default())
}

/// 20-byte binary info hash percent-encoded the way real clients send it.
fn binary_info_hash_param() -> (String, [u8; 20]) {
    let raw: [u8; 20] = [
        0x00, 0x01, 0xff, 0x7f, 0x80, 0x20, 0x26, 0x3d, 0x25, 0x2b, 0x0a, 0x0d, 0x41, 0x61, 0x39,
        0xde, 0xad, 0xbe, 0xef, 0x00,
    ];
    let encoded: String = raw.iter().map(|b| format!("%{b:02X}")).collect();
    (encoded, raw)
}

#[test]
fn announce_request_with_binary_info_hash() {
    let (encoded, raw) = binary_info_hash_param();
    let query = format!(
        "info_hash={encoded}&peer_id=-DN0001-abcdefghijkl&port=51413\
         &uploaded=2048&downloaded=8192&left=0&event=started&compact=1"
    );

    let mut sink = VecSink::new();
    analyzer().announce_request(&query, &mut sink);

    let events = sink.take();
    assert_eq!(events.len(), 1);
    let Event::TrackerRequestSeen(request) = &events[0] else {
        panic!("expected request event, got {:?}", events[0]);
    };
    assert_eq!(request.info_hash.unwrap().as_bytes(), &raw);
    assert_eq!(request.peer_id.unwrap().as_bytes(), b"-DN0001-abcdefghijkl");
    assert_eq!(request.port, Some(51413));
    assert_eq!(request.event, Some(AnnounceEvent::Started));
    assert_eq!(request.compact, Some(true));
}

#[test]
fn compact_announce_response_yields_two_peers() {
    let mut body = Vec::new();
    body.extend_from_slice(b"d8:completei5e10:incompletei12e8:intervali1800e5:peers12:");
    body.extend_from_slice(&[127, 0, 0, 1, 0x1a, 0xe1]); // 127.0.0.1:6881
    body.extend_from_slice(&[192, 168, 1, 100, 0xc3, 0x50]); // 192.168.1.100:50000
    body.push(b'e');

    let mut sink = VecSink::new();
    analyzer().announce_response(&body, &mut sink);

    let events = sink.take();
    assert_eq!(events.len(), 1);
    let Event::TrackerResponseSeen(TrackerResponse::Announce(response)) = &events[0] else {
        panic!("expected announce event, got {:?}", events[0]);
    };
    assert_eq!(response.interval, Some(1800));
    assert_eq!(response.complete, Some(5));
    assert_eq!(response.incomplete, Some(12));
    assert_eq!(response.peers.len(), 2);
    assert_eq!(response.peers[0].addr.to_string(), "127.0.0.1:6881");
    assert_eq!(response.peers[1].addr.to_string(), "192.168.1.100:50000");
    assert!(response.peers.iter().all(|p| p.peer_id.is_none()));
}

#[test]
fn ragged_compact_peers_keep_whole_entries() {
    // 6 + 6 + 3 bytes: two peers plus a truncated tail.
    let mut body = Vec::new();
    body.extend_from_slice(b"d8:intervali60e5:peers15:");
    body.extend_from_slice(&[10, 0, 0, 1, 0x1a, 0xe1]);
    body.extend_from_slice(&[10, 0, 0, 2, 0x1a, 0xe2]);
    body.extend_from_slice(&[10, 0, 0]);
    body.push(b'e');

    let mut sink = VecSink::new();
    analyzer().announce_response(&body, &mut sink);

    let events = sink.take();
    assert_eq!(events.len(), 2);
    let Event::ProtocolError { kind, .. } = &events[0] else {
        panic!("expected error event, got {:?}", events[0]);
    };
    assert_eq!(*kind, ErrorKind::StructuralTracker);
    let Event::TrackerResponseSeen(TrackerResponse::Announce(response)) = &events[1] else {
        panic!("expected announce event, got {:?}", events[1]);
    };
    assert_eq!(response.peers.len(), 2);
}

#[test]
fn failed_announce_carries_reason_and_no_peers() {
    let mut sink = VecSink::new();
    analyzer().announce_response(b"d14:failure reason15:torrent unknowne", &mut sink);

    let events = sink.take();
    assert_eq!(events.len(), 1);
    let Event::TrackerResponseSeen(TrackerResponse::Announce(response)) = &events[0] else {
        panic!("expected announce event, got {:?}", events[0]);
    };
    assert_eq!(response.failure_reason.as_deref(), Some("torrent unknown"));
    assert!(response.peers.is_empty());
    assert!(response.interval.is_none());
}

#[test]
fn scrape_response_maps_stats_per_torrent() {
    let mut body = Vec::new();
    body.extend_from_slice(b"d5:filesd20:");
    body.extend_from_slice(&[0x11; 20]);
    body.extend_from_slice(b"d8:completei42e10:downloadedi100e10:incompletei7ee20:");
    body.extend_from_slice(&[0x22; 20]);
    body.extend_from_slice(b"d8:completei0eeee");

    let mut sink = VecSink::new();
    analyzer().scrape_response(&body, &mut sink);

    let events = sink.take();
    assert_eq!(events.len(), 1);
    let Event::TrackerResponseSeen(TrackerResponse::Scrape(response)) = &events[0] else {
        panic!("expected scrape event, got {:?}", events[0]);
    };
    assert_eq!(response.files.len(), 2);
    let first = response
        .files
        .iter()
        .find(|(hash, _)| hash.as_bytes() == &[0x11; 20])
        .map(|(_, stats)| stats)
        .unwrap();
    assert_eq!(first.complete, Some(42));
    assert_eq!(first.downloaded, Some(100));
    assert_eq!(first.incomplete, Some(7));
}

#[test]
fn strict_key_order_rejects_what_lenient_reports() {
    let body = b"d5:peers0:8:intervali300ee";

    let mut lenient_sink = VecSink::new();
    analyzer().announce_response(body, &mut lenient_sink);
    let lenient = lenient_sink.take();
    assert_eq!(lenient.len(), 2);
    assert!(matches!(
        lenient[0],
        Event::ProtocolError {
            kind: ErrorKind::MalformedBencode,
            ..
        }
    ));
    assert!(matches!(lenient[1], Event::TrackerResponseSeen(_)));

    let strict_config = AnalyzerConfig {
        bencode: BencodeConfig {
            strict_key_order: true,
            ..BencodeConfig::default()
        },
        ..AnalyzerConfig::default()
    };
    let mut strict_sink = VecSink::new();
    TrackerAnalyzer::new(&strict_config).announce_response(body, &mut strict_sink);
    let strict = strict_sink.take();
    assert_eq!(strict.len(), 1);
    assert!(matches!(
        strict[0],
        Event::ProtocolError {
            kind: ErrorKind::MalformedBencode,
            ..
        }
    ));
}

#[test]
fn tracker_events_serialize_as_tagged_json() {
    let mut sink = VecSink::new();
    let analyzer = analyzer();
    analyzer.announce_request(
        "info_hash=aaaaaaaaaaaaaaaaaaaa&peer_id=bbbbbbbbbbbbbbbbbbbb&port=6881\
         &uploaded=0&downloaded=0&left=512",
        &mut sink,
    );
    analyzer.announce_response(
        b"d8:intervali900e5:peers6:\x7f\x00\x00\x01\x1a\xe1e",
        &mut sink,
    );

    let events = sink.take();
    assert_eq!(events.len(), 2);

    let request = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(request["event"], "tracker_request_seen");
    assert_eq!(request["info_hash"], "61".repeat(20));
    assert_eq!(request["port"], 6881);
    assert_eq!(request["left"], 512);

    let response = serde_json::to_value(&events[1]).unwrap();
    assert_eq!(response["event"], "tracker_response_seen");
    assert_eq!(response["kind"], "announce");
    assert_eq!(response["interval"], 900);
    assert_eq!(response["peers"][0]["addr"], "127.0.0.1:6881");
}
