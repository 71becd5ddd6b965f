//! Announce and scrape response projection from bencode values
//!
//! Given an already-decoded top-level value, extracts the typed records
//! of [`super::types`]. Defects degrade the result field by field; the
//! issue list describes everything that could not be used.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

use crate::bencode::Value;
use crate::wire::{InfoHash, PeerId};

use super::types::{AnnounceResponse, PeerEntry, ScrapeResponse, ScrapeStats};

/// Compact peer entry: 4-byte IPv4 address + 2-byte big-endian port.
pub const COMPACT_PEER_V4_LEN: usize = 6;

/// Compact IPv6 peer entry per BEP 7: 16-byte address + 2-byte port.
pub const COMPACT_PEER_V6_LEN: usize = 18;

/// Projects an announce response dictionary.
pub fn parse_announce_response(value: &Value) -> (AnnounceResponse, Vec<String>) {
    let mut response = AnnounceResponse::default();
    let mut issues = Vec::new();

    if value.as_dict().is_none() {
        issues.push("announce response is not a dictionary".to_string());
        return (response, issues);
    }

    response.failure_reason = optional_string(value, "failure reason", &mut issues);
    response.warning_message = optional_string(value, "warning message", &mut issues);
    response.tracker_id = optional_string(value, "tracker id", &mut issues);
    response.min_interval = optional_count(value, "min interval", &mut issues);
    response.complete = optional_count(value, "complete", &mut issues);
    response.incomplete = optional_count(value, "incomplete", &mut issues);

    // A refusal carries only "failure reason"; nothing else is expected.
    let refused = response.failure_reason.is_some();

    response.interval = optional_count(value, "interval", &mut issues);
    if response.interval.is_none() && !refused && value.get(b"interval").is_none() {
        issues.push("missing required key 'interval'".to_string());
    }

    match value.get(b"peers") {
        Some(Value::Bytes(packed)) => {
            response.peers = parse_compact_peers(packed, &mut issues);
        }
        Some(Value::List(entries)) => {
            response.peers = parse_peer_dicts(entries, &mut issues);
        }
        Some(_) => issues.push("'peers' is neither a byte string nor a list".to_string()),
        None if !refused => issues.push("missing required key 'peers'".to_string()),
        None => {}
    }

    match value.get(b"peers6") {
        Some(Value::Bytes(packed)) => {
            response.peers.extend(parse_compact_peers6(packed, &mut issues));
        }
        Some(_) => issues.push("'peers6' is not a byte string".to_string()),
        None => {}
    }

    (response, issues)
}

/// Projects a scrape response dictionary.
pub fn parse_scrape_response(value: &Value) -> (ScrapeResponse, Vec<String>) {
    let mut response = ScrapeResponse::default();
    let mut issues = Vec::new();

    if value.as_dict().is_none() {
        issues.push("scrape response is not a dictionary".to_string());
        return (response, issues);
    }

    response.failure_reason = optional_string(value, "failure reason", &mut issues);

    match value.get(b"files") {
        Some(Value::Dict(files)) => {
            for (key, stats_value) in files {
                let Some(info_hash) = InfoHash::from_slice(key) else {
                    issues.push(format!(
                        "scrape file key is {} bytes, expected a 20-byte info-hash",
                        key.len()
                    ));
                    continue;
                };
                if stats_value.as_dict().is_none() {
                    issues.push(format!("scrape entry for {info_hash} is not a dictionary"));
                    continue;
                }
                let stats = ScrapeStats {
                    complete: optional_count(stats_value, "complete", &mut issues),
                    downloaded: optional_count(stats_value, "downloaded", &mut issues),
                    incomplete: optional_count(stats_value, "incomplete", &mut issues),
                    name: optional_string(stats_value, "name", &mut issues),
                };
                response.files.insert(info_hash, stats);
            }
        }
        Some(_) => issues.push("'files' is not a dictionary".to_string()),
        None if response.failure_reason.is_none() => {
            issues.push("missing required key 'files'".to_string());
        }
        None => {}
    }

    (response, issues)
}

/// Unpacks a compact IPv4 peer string. Whole entries before a ragged
/// tail are kept; the tail itself is reported.
pub fn parse_compact_peers(packed: &[u8], issues: &mut Vec<String>) -> Vec<PeerEntry> {
    if !packed.len().is_multiple_of(COMPACT_PEER_V4_LEN) {
        issues.push(format!(
            "compact peer string of {} bytes is not a multiple of {COMPACT_PEER_V4_LEN}",
            packed.len()
        ));
    }

    packed
        .chunks_exact(COMPACT_PEER_V4_LEN)
        .map(|chunk| {
            let ip = Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]);
            let port = u16::from_be_bytes([chunk[4], chunk[5]]);
            PeerEntry {
                peer_id: None,
                addr: SocketAddr::V4(SocketAddrV4::new(ip, port)),
            }
        })
        .collect()
}

/// Unpacks a compact IPv6 peer string (BEP 7).
pub fn parse_compact_peers6(packed: &[u8], issues: &mut Vec<String>) -> Vec<PeerEntry> {
    if !packed.len().is_multiple_of(COMPACT_PEER_V6_LEN) {
        issues.push(format!(
            "compact peers6 string of {} bytes is not a multiple of {COMPACT_PEER_V6_LEN}",
            packed.len()
        ));
    }

    packed
        .chunks_exact(COMPACT_PEER_V6_LEN)
        .map(|chunk| {
            let octets: [u8; 16] = chunk[..16].try_into().expect("chunk is 18 bytes");
            let port = u16::from_be_bytes([chunk[16], chunk[17]]);
            PeerEntry {
                peer_id: None,
                addr: SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::from(octets), port, 0, 0)),
            }
        })
        .collect()
}

fn parse_peer_dicts(entries: &[Value], issues: &mut Vec<String>) -> Vec<PeerEntry> {
    let mut peers = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        if entry.as_dict().is_none() {
            issues.push(format!("peer entry {index} is not a dictionary"));
            continue;
        }

        let ip = entry.get(b"ip").and_then(Value::as_str);
        let port = entry.get(b"port").and_then(Value::as_integer);

        let addr = match (ip.and_then(|s| s.parse().ok()), port) {
            (Some(ip), Some(port @ 0..=65_535)) => SocketAddr::new(ip, port as u16),
            _ => {
                issues.push(format!("peer entry {index} has no usable ip/port"));
                continue;
            }
        };

        let peer_id = entry
            .get(b"peer id")
            .and_then(Value::as_bytes)
            .and_then(|bytes| PeerId::from_slice(bytes));

        peers.push(PeerEntry { peer_id, addr });
    }

    peers
}

fn optional_string(value: &Value, key: &str, issues: &mut Vec<String>) -> Option<String> {
    match value.get(key.as_bytes()) {
        Some(Value::Bytes(bytes)) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Some(_) => {
            issues.push(format!("'{key}' is not a string"));
            None
        }
        None => None,
    }
}

fn optional_count(value: &Value, key: &str, issues: &mut Vec<String>) -> Option<u32> {
    match value.get(key.as_bytes()) {
        Some(Value::Integer(n)) if (0..=i64::from(u32::MAX)).contains(n) => Some(*n as u32),
        Some(Value::Integer(n)) => {
            issues.push(format!("'{key}' value {n} is out of range"));
            None
        }
        Some(_) => {
            issues.push(format!("'{key}' is not an integer"));
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bencode::decode;
    use crate::config::BencodeConfig;

    fn value(input: &[u8]) -> Value {
        decode(input, &BencodeConfig::default()).unwrap().value
    }

    #[test]
    fn test_compact_peers_twelve_bytes_two_entries() {
        let packed = [
            127, 0, 0, 1, 26, 225, // 127.0.0.1:6881 (26*256+225)
            192, 168, 1, 100, 195, 80, // 192.168.1.100:50000
        ];
        let mut issues = Vec::new();
        let peers = parse_compact_peers(&packed, &mut issues);

        assert!(issues.is_empty());
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[0].addr.to_string(), "127.0.0.1:6881");
        assert_eq!(peers[1].addr.to_string(), "192.168.1.100:50000");
    }

    #[test]
    fn test_compact_peers_ragged_tail() {
        let packed = [127, 0, 0, 1, 26, 225, 10, 0]; // one entry + 2 stray bytes
        let mut issues = Vec::new();
        let peers = parse_compact_peers(&packed, &mut issues);

        assert_eq!(peers.len(), 1);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("8 bytes"));
    }

    #[test]
    fn test_announce_response_compact() {
        let body =
            b"d8:completei10e10:incompletei5e8:intervali1800e5:peers6:\x7f\x00\x00\x01\x1a\xe1e";
        let (response, issues) = parse_announce_response(&value(body));

        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
        assert_eq!(response.interval, Some(1800));
        assert_eq!(response.complete, Some(10));
        assert_eq!(response.incomplete, Some(5));
        assert_eq!(response.peers.len(), 1);
        assert_eq!(response.peers[0].addr.to_string(), "127.0.0.1:6881");
    }

    #[test]
    fn test_announce_response_dict_peers() {
        let body = b"d8:intervali900e5:peersld2:ip8:10.0.0.27:peer id20:PEERID_____20B______4:porti6881eeee";
        let (response, issues) = parse_announce_response(&value(body));

        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
        assert_eq!(response.peers.len(), 1);
        assert_eq!(response.peers[0].addr.to_string(), "10.0.0.2:6881");
        assert_eq!(
            response.peers[0].peer_id.unwrap().as_bytes(),
            b"PEERID_____20B______"
        );
    }

    #[test]
    fn test_announce_response_peers6() {
        let mut body = Vec::new();
        body.extend_from_slice(b"d8:intervali900e5:peers0:6:peers618:");
        body.extend_from_slice(&[0u8; 15]);
        body.extend_from_slice(&[1, 0x1a, 0xe1]); // ::1 port 6881
        body.push(b'e');
        let (response, issues) = parse_announce_response(&value(&body));

        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
        assert_eq!(response.peers.len(), 1);
        assert_eq!(response.peers[0].addr.to_string(), "[::1]:6881");
    }

    #[test]
    fn test_announce_failure_response() {
        let body = b"d14:failure reason17:torrent not founde";
        let (response, issues) = parse_announce_response(&value(body));

        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
        assert_eq!(
            response.failure_reason.as_deref(),
            Some("torrent not found")
        );
        assert!(response.interval.is_none());
        assert!(response.peers.is_empty());
    }

    #[test]
    fn test_announce_mistyped_interval_degrades() {
        let body = b"d8:interval4:soon5:peers0:e";
        let (response, issues) = parse_announce_response(&value(body));

        assert!(response.interval.is_none());
        assert!(response.peers.is_empty());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("'interval' is not an integer"));
    }

    #[test]
    fn test_announce_missing_required_keys() {
        let body = b"d10:incompletei3ee";
        let (response, issues) = parse_announce_response(&value(body));

        assert_eq!(response.incomplete, Some(3));
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|i| i.contains("'interval'")));
        assert!(issues.iter().any(|i| i.contains("'peers'")));
    }

    #[test]
    fn test_announce_not_a_dictionary() {
        let (response, issues) = parse_announce_response(&value(b"li1ee"));
        assert_eq!(response, AnnounceResponse::default());
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_scrape_response() {
        let mut body = Vec::new();
        body.extend_from_slice(b"d5:filesd20:");
        body.extend_from_slice(b"INFOHASH20B_________");
        body.extend_from_slice(b"d8:completei4e10:downloadedi90e10:incompletei2eeee");
        let (response, issues) = parse_scrape_response(&value(&body));

        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
        let info_hash = InfoHash::from_slice(b"INFOHASH20B_________").unwrap();
        let stats = &response.files[&info_hash];
        assert_eq!(stats.complete, Some(4));
        assert_eq!(stats.downloaded, Some(90));
        assert_eq!(stats.incomplete, Some(2));
        assert!(stats.name.is_none());
    }

    #[test]
    fn test_scrape_bad_key_degrades_per_entry() {
        let mut body = Vec::new();
        body.extend_from_slice(b"d5:filesd3:bad");
        body.extend_from_slice(b"d8:completei1ee20:");
        body.extend_from_slice(b"INFOHASH20B_________");
        body.extend_from_slice(b"d8:completei4eeee");
        let (response, issues) = parse_scrape_response(&value(&body));

        assert_eq!(response.files.len(), 1);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("3 bytes"));
    }

    #[test]
    fn test_scrape_failure_reason_only() {
        let body = b"d14:failure reason13:access deniede";
        let (response, issues) = parse_scrape_response(&value(body));
        assert!(issues.is_empty());
        assert_eq!(response.failure_reason.as_deref(), Some("access denied"));
    }
}
