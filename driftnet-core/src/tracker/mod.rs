//! Tracker protocol analysis
//!
//! The HTTP-based announce/scrape protocol, with bencoded response
//! bodies. The HTTP collaborator delivers complete units: a request's
//! query string, or a response body once reassembled. [`TrackerAnalyzer`]
//! decodes them and emits typed events.

pub mod query;
pub mod response;
pub mod types;

use tracing::debug;

pub use query::{parse_announce_query, percent_decode};
pub use response::{parse_announce_response, parse_scrape_response};
pub use types::{
    AnnounceEvent, AnnounceRequest, AnnounceResponse, PeerEntry, ScrapeResponse, ScrapeStats,
    TrackerResponse,
};

use crate::bencode::{self, Value};
use crate::config::{AnalyzerConfig, BencodeConfig};
use crate::events::{ErrorKind, Event, EventSink};

/// Analyzer for one side's tracker exchanges.
///
/// Stateless between calls; each request or response body is a complete
/// unit. Structural defects are emitted as events alongside the degraded
/// record, so one bad key never suppresses the rest of an announce.
#[derive(Debug, Clone)]
pub struct TrackerAnalyzer {
    bencode: BencodeConfig,
}

impl TrackerAnalyzer {
    /// Creates a tracker analyzer sharing the configured decode limits.
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            bencode: config.bencode.clone(),
        }
    }

    /// Processes an announce GET's query string.
    pub fn announce_request(&self, query: &str, sink: &mut dyn EventSink) {
        let (request, issues) = parse_announce_query(query);
        debug!(issues = issues.len(), "announce request");
        for issue in issues {
            sink.emit(Event::error(ErrorKind::StructuralTracker, issue));
        }
        sink.emit(Event::TrackerRequestSeen(request));
    }

    /// Processes a complete announce response body.
    pub fn announce_response(&self, body: &[u8], sink: &mut dyn EventSink) {
        let Some(value) = self.decode_body(body, sink) else {
            return;
        };
        let (response, issues) = parse_announce_response(&value);
        debug!(peers = response.peers.len(), issues = issues.len(), "announce response");
        for issue in issues {
            sink.emit(Event::error(ErrorKind::StructuralTracker, issue));
        }
        sink.emit(Event::TrackerResponseSeen(TrackerResponse::Announce(
            response,
        )));
    }

    /// Processes a complete scrape response body.
    pub fn scrape_response(&self, body: &[u8], sink: &mut dyn EventSink) {
        let Some(value) = self.decode_body(body, sink) else {
            return;
        };
        let (response, issues) = parse_scrape_response(&value);
        debug!(files = response.files.len(), issues = issues.len(), "scrape response");
        for issue in issues {
            sink.emit(Event::error(ErrorKind::StructuralTracker, issue));
        }
        sink.emit(Event::TrackerResponseSeen(TrackerResponse::Scrape(
            response,
        )));
    }

    /// Runs the bounded bencode decoder over a response body. A decode
    /// failure ends the unit; a soft key-order violation is reported and
    /// projection proceeds.
    fn decode_body(&self, body: &[u8], sink: &mut dyn EventSink) -> Option<Value> {
        match bencode::decode(body, &self.bencode) {
            Ok(decoded) => {
                if let Some(offset) = decoded.key_order_violation {
                    sink.emit(Event::error(
                        ErrorKind::MalformedBencode,
                        format!("dictionary keys out of order at offset {offset}"),
                    ));
                }
                Some(decoded.value)
            }
            Err(err) => {
                sink.emit(Event::error(ErrorKind::MalformedBencode, err.to_string()));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecSink;

    fn analyzer() -> TrackerAnalyzer {
        TrackerAnalyzer::new(&AnalyzerConfig::default())
    }

    #[test]
    fn test_clean_announce_exchange() {
        let mut sink = VecSink::new();
        let analyzer = analyzer();

        analyzer.announce_request(
            "info_hash=aaaaaaaaaaaaaaaaaaaa&peer_id=bbbbbbbbbbbbbbbbbbbb&port=6881\
             &uploaded=0&downloaded=0&left=1000",
            &mut sink,
        );
        analyzer.announce_response(
            b"d8:intervali1800e5:peers6:\x7f\x00\x00\x01\x1a\xe1e",
            &mut sink,
        );

        let events = sink.take();
        assert_eq!(events.len(), 2);
        let Event::TrackerRequestSeen(request) = &events[0] else {
            panic!("expected request event, got {:?}", events[0]);
        };
        assert_eq!(request.port, Some(6881));
        let Event::TrackerResponseSeen(TrackerResponse::Announce(response)) = &events[1] else {
            panic!("expected response event, got {:?}", events[1]);
        };
        assert_eq!(response.interval, Some(1800));
        assert_eq!(response.peers.len(), 1);
    }

    #[test]
    fn test_malformed_bencode_body() {
        let mut sink = VecSink::new();
        analyzer().announce_response(b"d8:interval", &mut sink);

        let events = sink.take();
        assert_eq!(events.len(), 1);
        let Event::ProtocolError { kind, detail } = &events[0] else {
            panic!("expected error event, got {:?}", events[0]);
        };
        assert_eq!(*kind, ErrorKind::MalformedBencode);
        assert!(detail.contains("offset 11"));
    }

    #[test]
    fn test_soft_key_order_violation_reported_and_projected() {
        let mut sink = VecSink::new();
        // peers before interval: decodes leniently, order reported.
        analyzer().announce_response(b"d5:peers0:8:intervali60ee", &mut sink);

        let events = sink.take();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            Event::ProtocolError {
                kind: ErrorKind::MalformedBencode,
                ..
            }
        ));
        let Event::TrackerResponseSeen(TrackerResponse::Announce(response)) = &events[1] else {
            panic!("expected response event, got {:?}", events[1]);
        };
        assert_eq!(response.interval, Some(60));
    }

    #[test]
    fn test_strict_key_order_fails_decode() {
        let config = AnalyzerConfig {
            bencode: BencodeConfig {
                strict_key_order: true,
                ..BencodeConfig::default()
            },
            ..AnalyzerConfig::default()
        };
        let mut sink = VecSink::new();
        TrackerAnalyzer::new(&config)
            .announce_response(b"d5:peers0:8:intervali60ee", &mut sink);

        let events = sink.take();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            Event::ProtocolError {
                kind: ErrorKind::MalformedBencode,
                ..
            }
        ));
    }

    #[test]
    fn test_degraded_request_still_projected() {
        let mut sink = VecSink::new();
        analyzer().announce_request("info_hash=tooshort&port=81", &mut sink);

        let events = sink.take();
        // Short hash + 4 missing required keys, then the degraded record.
        assert_eq!(events.len(), 6);
        for event in &events[..5] {
            assert!(matches!(
                event,
                Event::ProtocolError {
                    kind: ErrorKind::StructuralTracker,
                    ..
                }
            ));
        }
        let Event::TrackerRequestSeen(request) = &events[5] else {
            panic!("expected request event, got {:?}", events[5]);
        };
        assert_eq!(request.port, Some(81));
        assert!(request.info_hash.is_none());
    }

    #[test]
    fn test_scrape_flow() {
        let mut body = Vec::new();
        body.extend_from_slice(b"d5:filesd20:");
        body.extend_from_slice(&[0x42; 20]);
        body.extend_from_slice(b"d8:completei7eeee");

        let mut sink = VecSink::new();
        analyzer().scrape_response(&body, &mut sink);

        let events = sink.take();
        assert_eq!(events.len(), 1);
        let Event::TrackerResponseSeen(TrackerResponse::Scrape(response)) = &events[0] else {
            panic!("expected scrape event, got {:?}", events[0]);
        };
        assert_eq!(response.files.len(), 1);
    }
}
