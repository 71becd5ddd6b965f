//! Structured projections of tracker protocol exchanges
//!
//! These records are best-effort: a malformed field leaves its slot
//! `None` and is reported separately, so one bad key never discards the
//! rest of an announce.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use serde::Serialize;

use crate::wire::{InfoHash, PeerId};

/// Client state change reported in an announce request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnounceEvent {
    /// Client started downloading this torrent
    Started,
    /// Client stopped downloading this torrent
    Stopped,
    /// Client completed downloading this torrent
    Completed,
}

/// Announce request extracted from an HTTP GET query string.
///
/// Required protocol keys are `info_hash`, `peer_id`, `port`, `uploaded`,
/// `downloaded`, and `left`; everything else is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnnounceRequest {
    /// Torrent being announced
    pub info_hash: Option<InfoHash>,
    /// Identifier the client claims for itself
    pub peer_id: Option<PeerId>,
    /// TCP port the client listens on
    pub port: Option<u16>,
    /// Total bytes uploaded to other peers
    pub uploaded: Option<u64>,
    /// Total bytes downloaded from other peers
    pub downloaded: Option<u64>,
    /// Bytes remaining to download (0 for seeders)
    pub left: Option<u64>,
    /// State change this announce reports, if any. Serialized as
    /// `announce_event` because [`crate::events::Event`] uses `event`
    /// as its JSON tag.
    #[serde(rename = "announce_event")]
    pub event: Option<AnnounceEvent>,
    /// Address the client asks the tracker to publish
    pub ip: Option<IpAddr>,
    /// Number of peers the client wants back
    pub numwant: Option<u32>,
    /// Whether the client asked for the compact peer format
    pub compact: Option<bool>,
    /// Client session key, opaque to the tracker
    pub key: Option<String>,
    /// Tracker id echoed back from an earlier response
    pub tracker_id: Option<String>,
}

/// One peer published by a tracker, normalized from either the compact
/// or the dictionary peer-list form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerEntry {
    /// Present only in the dictionary form
    pub peer_id: Option<PeerId>,
    pub addr: SocketAddr,
}

/// Announce response projected from a bencoded dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnnounceResponse {
    /// Seconds the client should wait before re-announcing
    pub interval: Option<u32>,
    /// Minimum re-announce interval the tracker enforces
    pub min_interval: Option<u32>,
    /// Seeders in the swarm
    pub complete: Option<u32>,
    /// Leechers in the swarm
    pub incomplete: Option<u32>,
    /// Identifier to echo in the next announce
    pub tracker_id: Option<String>,
    /// Human-readable warning; the response is otherwise usable
    pub warning_message: Option<String>,
    /// Present instead of the other keys when the tracker refused the
    /// announce
    pub failure_reason: Option<String>,
    /// Published peers, compact and dictionary forms normalized
    pub peers: Vec<PeerEntry>,
}

/// Per-torrent statistics from a scrape response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScrapeStats {
    /// Seeders
    pub complete: Option<u32>,
    /// Completed downloads all-time
    pub downloaded: Option<u32>,
    /// Leechers
    pub incomplete: Option<u32>,
    /// Torrent name, if the tracker publishes it
    pub name: Option<String>,
}

/// Scrape response projected from a bencoded dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScrapeResponse {
    /// Statistics per requested torrent
    pub files: HashMap<InfoHash, ScrapeStats>,
    pub failure_reason: Option<String>,
}

/// Either kind of tracker response, as carried by an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackerResponse {
    Announce(AnnounceResponse),
    Scrape(ScrapeResponse),
}
