//! Driftnet Core - Passive BitTorrent protocol analysis
//!
//! Turns attacker-influenced byte streams already identified as
//! BitTorrent traffic into validated, typed protocol events. Covers the
//! binary peer wire protocol (incremental, chunk-boundary-agnostic state
//! machine) and the HTTP tracker protocol (bencoded announce/scrape
//! payloads). The surrounding system — connection demultiplexing, TCP
//! reassembly, HTTP parsing, event consumption — is a collaborator; this
//! crate performs no I/O and never blocks.

pub mod bencode;
pub mod config;
pub mod events;
pub mod tracker;
pub mod wire;

// Re-export main types for convenient access
pub use bencode::BencodeError;
pub use config::AnalyzerConfig;
pub use events::{ErrorKind, Event, EventSink, SharedVecSink, TracingSink, VecSink};
pub use tracker::TrackerAnalyzer;
pub use wire::{Connection, Direction, PeerWireAnalyzer, WireError};

/// Core errors that can bubble up from any Driftnet subsystem.
#[derive(Debug, thiserror::Error)]
pub enum DriftnetError {
    #[error("bencode error: {0}")]
    Bencode(#[from] BencodeError),

    #[error("wire protocol error: {0}")]
    Wire(#[from] WireError),
}

pub type Result<T> = std::result::Result<T, DriftnetError>;
