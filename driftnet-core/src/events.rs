//! Typed protocol events and the sink contract
//!
//! Every completed, validated unit of protocol activity becomes exactly
//! one [`Event`], pushed into an [`EventSink`]. The sink belongs to the
//! downstream analysis/logging framework; emission is fire-and-forget and
//! parsers never depend on a sink's behavior.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::tracker::{AnnounceRequest, TrackerResponse};
use crate::wire::{Handshake, PeerMessage};

/// Classification of a reported protocol failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Wrong protocol identifier or a truncated initial record; the
    /// connection is probably not BitTorrent
    MalformedHandshake,
    /// Declared frame length above the configured maximum
    OversizedFrame,
    /// Peer wire frame whose declared length contradicts its layout
    MalformedMessage,
    /// Bencode syntax violation
    MalformedBencode,
    /// Well-formed bencode with missing or mistyped tracker keys
    StructuralTracker,
}

/// A single observed unit of BitTorrent protocol activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Validated peer wire handshake
    HandshakeSeen(Handshake),
    /// Completed peer wire message frame
    PeerMessageSeen {
        /// Length declared by the frame header
        declared_length: u32,
        message: PeerMessage,
    },
    /// Announce request extracted from an HTTP query string
    TrackerRequestSeen(AnnounceRequest),
    /// Announce or scrape response decoded from an HTTP body
    TrackerResponseSeen(TrackerResponse),
    /// Scoped failure; parsing of other units continues where offsets
    /// remain reliable
    ProtocolError { kind: ErrorKind, detail: String },
}

impl Event {
    /// Convenience constructor for error events.
    pub fn error(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Event::ProtocolError {
            kind,
            detail: detail.into(),
        }
    }
}

/// Narrow push contract between parsers and the analysis framework.
pub trait EventSink {
    /// Hands over one completed event. Must not block the parser.
    fn emit(&mut self, event: Event);
}

/// Sink that collects events in order; the default for tests and for
/// offline batch analysis.
#[derive(Debug, Default)]
pub struct VecSink {
    events: Vec<Event>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events emitted so far, in emission order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Drains and returns all collected events.
    pub fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

impl EventSink for VecSink {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// Cloneable sink shared between the two directions of a connection, or
/// across worker threads.
#[derive(Debug, Clone, Default)]
pub struct SharedVecSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl SharedVecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns all collected events.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for SharedVecSink {
    fn emit(&mut self, event: Event) {
        self.events.lock().push(event);
    }
}

/// Sink that forwards events to the `tracing` subscriber as structured
/// JSON records, for deployments where the analysis framework is a log
/// pipeline.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: Event) {
        let json = serde_json::to_string(&event)
            .unwrap_or_else(|e| format!("{{\"serialize_error\":\"{e}\"}}"));
        match &event {
            Event::ProtocolError { kind, detail } => {
                warn!(target: "driftnet::events", ?kind, %detail, %json, "protocol error");
            }
            _ => {
                debug!(target: "driftnet::events", %json, "protocol event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{InfoHash, PeerId};

    #[test]
    fn test_vec_sink_preserves_order() {
        let mut sink = VecSink::new();
        sink.emit(Event::PeerMessageSeen {
            declared_length: 0,
            message: PeerMessage::KeepAlive,
        });
        sink.emit(Event::error(ErrorKind::OversizedFrame, "declared 5000000"));

        let events = sink.take();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::PeerMessageSeen { .. }));
        assert!(matches!(events[1], Event::ProtocolError { .. }));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_shared_sink_is_cloneable() {
        let sink = SharedVecSink::new();
        let mut a = sink.clone();
        let mut b = sink.clone();
        a.emit(Event::error(ErrorKind::MalformedBencode, "offset 3"));
        b.emit(Event::error(ErrorKind::StructuralTracker, "missing peers"));
        assert_eq!(sink.take().len(), 2);
    }

    #[test]
    fn test_event_serializes_tagged() {
        let event = Event::HandshakeSeen(Handshake {
            protocol: "BitTorrent protocol".to_string(),
            reserved: [0u8; 8],
            info_hash: InfoHash::new([0x01; 20]),
            peer_id: PeerId::new([0x02; 20]),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "handshake_seen");
        assert_eq!(json["info_hash"], "01".repeat(20));
        assert_eq!(json["peer_id"], "02".repeat(20));
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let event = Event::error(ErrorKind::MalformedHandshake, "not bittorrent");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "protocol_error");
        assert_eq!(json["kind"], "malformed_handshake");
    }
}
