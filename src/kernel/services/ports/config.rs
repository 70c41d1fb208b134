use serde::{Deserialize, Serialize};

use super::segment::TextEncoding;

pub const DEFAULT_MATCH_CAP: usize = 50_000;
pub const DEFAULT_SEGMENT_SIZE: u64 = 64 * 1024;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Upper bound on matches retained across all segments.
    #[serde(default = "default_match_cap")]
    pub match_cap: usize,
    #[serde(default = "default_segment_size")]
    pub segment_size: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub encoding: TextEncoding,
}

fn default_match_cap() -> usize {
    DEFAULT_MATCH_CAP
}

fn default_segment_size() -> u64 {
    DEFAULT_SEGMENT_SIZE
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            match_cap: DEFAULT_MATCH_CAP,
            segment_size: DEFAULT_SEGMENT_SIZE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            encoding: TextEncoding::default(),
        }
    }
}

impl SearchSettings {
    pub fn with_match_cap(mut self, match_cap: usize) -> Self {
        self.match_cap = match_cap;
        self
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
