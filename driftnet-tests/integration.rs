//! Integration tests for Driftnet
//!
//! Cross-module scenarios: full peer wire sessions under arbitrary
//! chunking, tracker announce/scrape exchanges, and the encode/decode
//! laws the parsers guarantee.

mod bencode_laws;
mod peer_wire;
mod tracker_flow;
