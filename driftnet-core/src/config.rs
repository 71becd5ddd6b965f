//! Centralized configuration for Driftnet.
//!
//! All tunable limits are defined here and shared read-only across
//! connection contexts, instead of living in process-wide registries.

/// Central configuration for all analyzer components.
///
/// Groups related settings into logical sections. Cheap to clone; every
/// parser instance receives its own copy at construction and the limits
/// are never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfig {
    pub wire: WireConfig,
    pub bencode: BencodeConfig,
}

/// Peer wire protocol configuration.
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Handshake protocol identifier a connection must present
    pub expected_protocol_name: String,
    /// Largest declared frame length that will be buffered; anything
    /// above this aborts the direction instead of accumulating bytes
    pub max_frame_length: u32,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            expected_protocol_name: "BitTorrent protocol".to_string(),
            max_frame_length: 4 * 1024 * 1024, // 4 MiB
        }
    }
}

/// Bencode decoder configuration.
///
/// Bounds recursion and total decoded node count so hostile payloads
/// cannot exhaust the stack or memory through nesting alone.
#[derive(Debug, Clone)]
pub struct BencodeConfig {
    /// Maximum container nesting depth
    pub max_depth: usize,
    /// Maximum number of decoded values in a single document
    pub max_values: usize,
    /// Treat out-of-order dictionary keys as a hard parse failure
    /// instead of a reported-but-tolerated condition
    pub strict_key_order: bool,
}

impl Default for BencodeConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_values: 65_536,
            strict_key_order: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.wire.expected_protocol_name, "BitTorrent protocol");
        assert_eq!(config.wire.max_frame_length, 4 * 1024 * 1024);
        assert_eq!(config.bencode.max_depth, 32);
        assert!(!config.bencode.strict_key_order);
    }
}
