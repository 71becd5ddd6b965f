//! Per-direction peer wire protocol state machine
//!
//! Consumes one direction of a connection's byte stream through a
//! [`StreamCursor`] and emits one event per completed unit. The machine
//! is re-entrant across arbitrary chunk boundaries: whatever a call
//! cannot complete stays in the cursor as residue, and the event
//! sequence is identical no matter how the bytes were chunked.

use tracing::{debug, trace};

use super::WireError;
use super::cursor::StreamCursor;
use super::handshake::{HandshakeCodec, handshake_len};
use super::messages::MessageCodec;
use super::types::PeerMessage;
use crate::config::AnalyzerConfig;
use crate::events::{ErrorKind, Event, EventSink};

/// Which endpoint of the connection this byte stream flows from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bytes sent by the connection originator
    Originator,
    /// Bytes sent by the responder
    Responder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireState {
    AwaitingHandshake,
    AwaitingMessageHeader,
    AwaitingMessageBody { declared: u32 },
    Aborted,
}

/// Incremental analyzer for one direction of a peer wire connection.
///
/// Holds the state-machine state, the cursor residue, and nothing else;
/// teardown is dropping the value. The opposite direction is an
/// independent instance.
#[derive(Debug)]
pub struct PeerWireAnalyzer {
    direction: Direction,
    expected_protocol: String,
    state: WireState,
    cursor: StreamCursor,
}

impl PeerWireAnalyzer {
    /// Creates an analyzer for one connection direction.
    pub fn new(config: &AnalyzerConfig, direction: Direction) -> Self {
        Self {
            direction,
            expected_protocol: config.wire.expected_protocol_name.clone(),
            state: WireState::AwaitingHandshake,
            cursor: StreamCursor::new(config.wire.max_frame_length),
        }
    }

    /// True once a validation or cursor failure has abandoned this
    /// direction.
    pub fn is_aborted(&self) -> bool {
        self.state == WireState::Aborted
    }

    /// Feeds the next chunk of stream bytes and drains every unit that
    /// is now complete, emitting one event per unit.
    ///
    /// Never blocks; returns as soon as the residue no longer holds a
    /// complete unit. Chunks may be of any size, including empty.
    pub fn push(&mut self, chunk: &[u8], sink: &mut dyn EventSink) {
        if self.state == WireState::Aborted {
            return;
        }
        self.cursor.extend(chunk);

        loop {
            match self.state {
                WireState::AwaitingHandshake => {
                    if !self.drive_handshake(sink) {
                        return;
                    }
                }
                WireState::AwaitingMessageHeader => {
                    let Some(declared) = self.cursor.take_u32_be() else {
                        return;
                    };
                    if declared == 0 {
                        debug!(direction = ?self.direction, "keep-alive");
                        sink.emit(Event::PeerMessageSeen {
                            declared_length: 0,
                            message: PeerMessage::KeepAlive,
                        });
                        continue;
                    }
                    trace!(direction = ?self.direction, declared, "message header");
                    self.state = WireState::AwaitingMessageBody { declared };
                }
                WireState::AwaitingMessageBody { declared } => {
                    match self.cursor.take_frame(declared) {
                        Err(err @ WireError::OversizedFrame { .. }) => {
                            self.abort(ErrorKind::OversizedFrame, err.to_string(), sink);
                            return;
                        }
                        Err(err) => {
                            self.abort(ErrorKind::MalformedMessage, err.to_string(), sink);
                            return;
                        }
                        Ok(None) => return,
                        Ok(Some(body)) => match MessageCodec::decode(declared, &body) {
                            Ok(message) => {
                                debug!(direction = ?self.direction, ?message, "message");
                                sink.emit(Event::PeerMessageSeen {
                                    declared_length: declared,
                                    message,
                                });
                                self.state = WireState::AwaitingMessageHeader;
                            }
                            Err(err) => {
                                // Frame boundary is still known, so only
                                // this unit is lost.
                                sink.emit(Event::error(
                                    ErrorKind::MalformedMessage,
                                    err.to_string(),
                                ));
                                self.state = WireState::AwaitingMessageHeader;
                            }
                        },
                    }
                }
                WireState::Aborted => return,
            }
        }
    }

    /// Reports teardown. A direction still waiting for its handshake with
    /// bytes in the residue never saw a well-formed initial record.
    pub fn close(&mut self, sink: &mut dyn EventSink) {
        if self.state == WireState::AwaitingHandshake && self.cursor.available() > 0 {
            sink.emit(Event::error(
                ErrorKind::MalformedHandshake,
                format!(
                    "connection closed with incomplete handshake ({} bytes)",
                    self.cursor.available()
                ),
            ));
        }
        self.state = WireState::Aborted;
        self.cursor.clear();
    }

    /// Returns true when the handshake stage made a state transition and
    /// the loop should continue.
    fn drive_handshake(&mut self, sink: &mut dyn EventSink) -> bool {
        // The length byte alone can disqualify the connection; check it
        // before waiting for a full record that will never arrive.
        let Some(&[name_len]) = self.cursor.peek(1) else {
            return false;
        };
        if name_len as usize != self.expected_protocol.len() {
            self.abort(
                ErrorKind::MalformedHandshake,
                format!(
                    "protocol name length {name_len}, expected {}",
                    self.expected_protocol.len()
                ),
                sink,
            );
            return false;
        }

        let needed = handshake_len(self.expected_protocol.len());
        let Some(record) = self.cursor.take(needed) else {
            return false;
        };

        match HandshakeCodec::decode(&record, &self.expected_protocol) {
            Ok(handshake) => {
                debug!(
                    direction = ?self.direction,
                    info_hash = %handshake.info_hash,
                    peer_id = %handshake.peer_id,
                    "handshake"
                );
                sink.emit(Event::HandshakeSeen(handshake));
                self.state = WireState::AwaitingMessageHeader;
                true
            }
            Err(err) => {
                self.abort(ErrorKind::MalformedHandshake, err.to_string(), sink);
                false
            }
        }
    }

    fn abort(&mut self, kind: ErrorKind, detail: String, sink: &mut dyn EventSink) {
        debug!(direction = ?self.direction, ?kind, %detail, "direction aborted");
        sink.emit(Event::ProtocolError { kind, detail });
        self.state = WireState::Aborted;
        self.cursor.clear();
    }
}

/// Both directions of one peer wire connection.
///
/// The directions share no mutable state and may be advanced in any
/// relative order; dropping the value is teardown for both.
#[derive(Debug)]
pub struct Connection {
    pub originator: PeerWireAnalyzer,
    pub responder: PeerWireAnalyzer,
}

impl Connection {
    /// Creates analyzers for both directions of a connection.
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            originator: PeerWireAnalyzer::new(config, Direction::Originator),
            responder: PeerWireAnalyzer::new(config, Direction::Responder),
        }
    }
}
