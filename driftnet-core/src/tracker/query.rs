//! Announce request extraction from HTTP query strings
//!
//! The HTTP collaborator hands over the raw query string of a GET the
//! demultiplexer identified as tracker traffic. Values are percent-decoded
//! as raw bytes before interpretation because `info_hash` and `peer_id`
//! are binary, not UTF-8 text.

use std::net::IpAddr;

use super::types::{AnnounceEvent, AnnounceRequest};
use crate::wire::{InfoHash, PeerId};

const REQUIRED_KEYS: [&str; 6] = [
    "info_hash",
    "peer_id",
    "port",
    "uploaded",
    "downloaded",
    "left",
];

/// Decodes percent-encoded bytes; `+` means space per the
/// form-urlencoded convention trackers inherit from HTTP.
pub fn percent_decode(encoded: &str) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::with_capacity(encoded.len());
    let mut iter = encoded.bytes();

    while let Some(byte) = iter.next() {
        match byte {
            b'%' => {
                let hi = iter.next().ok_or("truncated percent escape")?;
                let lo = iter.next().ok_or("truncated percent escape")?;
                let hex = [hi, lo];
                let hex = std::str::from_utf8(&hex).map_err(|_| "invalid percent escape")?;
                let value =
                    u8::from_str_radix(hex, 16).map_err(|_| "invalid hex digit in escape")?;
                bytes.push(value);
            }
            b'+' => bytes.push(b' '),
            _ => bytes.push(byte),
        }
    }

    Ok(bytes)
}

/// Projects an announce query string into a typed record.
///
/// Best-effort: every defect (malformed value, wrong byte count, missing
/// required key) is described in the returned issue list; well-formed
/// fields are extracted regardless. Unrecognized parameters are ignored.
pub fn parse_announce_query(query: &str) -> (AnnounceRequest, Vec<String>) {
    let mut request = AnnounceRequest::default();
    let mut issues = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));

        let key = match percent_decode(raw_key) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(reason) => {
                issues.push(format!("undecodable parameter name {raw_key:?}: {reason}"));
                continue;
            }
        };
        let value = match percent_decode(raw_value) {
            Ok(bytes) => bytes,
            Err(reason) => {
                issues.push(format!("parameter '{key}': {reason}"));
                seen.push(key);
                continue;
            }
        };
        seen.push(key.clone());

        match key.as_str() {
            "info_hash" => {
                request.info_hash = InfoHash::from_slice(&value);
                if request.info_hash.is_none() {
                    issues.push(format!("info_hash is {} bytes, expected 20", value.len()));
                }
            }
            "peer_id" => {
                request.peer_id = PeerId::from_slice(&value);
                if request.peer_id.is_none() {
                    issues.push(format!("peer_id is {} bytes, expected 20", value.len()));
                }
            }
            "port" => request.port = parse_number(&key, &value, &mut issues),
            "uploaded" => request.uploaded = parse_number(&key, &value, &mut issues),
            "downloaded" => request.downloaded = parse_number(&key, &value, &mut issues),
            "left" => request.left = parse_number(&key, &value, &mut issues),
            "numwant" => request.numwant = parse_number(&key, &value, &mut issues),
            "event" => match value.as_slice() {
                b"started" => request.event = Some(AnnounceEvent::Started),
                b"stopped" => request.event = Some(AnnounceEvent::Stopped),
                b"completed" => request.event = Some(AnnounceEvent::Completed),
                // An empty event is a plain periodic announce.
                b"" => {}
                other => issues.push(format!(
                    "unrecognized event {:?}",
                    String::from_utf8_lossy(other)
                )),
            },
            "ip" => match std::str::from_utf8(&value)
                .ok()
                .and_then(|s| s.parse::<IpAddr>().ok())
            {
                Some(addr) => request.ip = Some(addr),
                None => issues.push(format!(
                    "ip {:?} is not an address",
                    String::from_utf8_lossy(&value)
                )),
            },
            "compact" => match value.as_slice() {
                b"1" => request.compact = Some(true),
                b"0" => request.compact = Some(false),
                other => issues.push(format!(
                    "compact flag {:?} is neither 0 nor 1",
                    String::from_utf8_lossy(other)
                )),
            },
            "key" => request.key = Some(String::from_utf8_lossy(&value).into_owned()),
            "trackerid" => request.tracker_id = Some(String::from_utf8_lossy(&value).into_owned()),
            _ => {}
        }
    }

    for required in REQUIRED_KEYS {
        if !seen.iter().any(|key| key == required) {
            issues.push(format!("missing required key '{required}'"));
        }
    }

    (request, issues)
}

fn parse_number<T: std::str::FromStr>(
    key: &str,
    value: &[u8],
    issues: &mut Vec<String>,
) -> Option<T> {
    let parsed = std::str::from_utf8(value).ok().and_then(|s| s.parse().ok());
    if parsed.is_none() {
        issues.push(format!(
            "parameter '{key}' value {:?} is not a valid number",
            String::from_utf8_lossy(value)
        ));
    }
    parsed
}
