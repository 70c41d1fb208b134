use std::io;
use std::sync::Arc;

use super::segment::{Segment, SegmentKey};
use crate::kernel::SearchSnapshot;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug)]
pub enum SearchError {
    Io(io::Error),
    InvalidRegex(regex::Error),
    Settings(serde_json::Error),
    MissingTailState,
    ScanPanicked(String),
    Upstream(String),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchError::Io(e) => write!(f, "IO error: {}", e),
            SearchError::InvalidRegex(e) => write!(f, "Invalid regex: {}", e),
            SearchError::Settings(e) => write!(f, "Invalid settings: {}", e),
            SearchError::MissingTailState => {
                write!(f, "Tail segment was scanned before it was registered")
            }
            SearchError::ScanPanicked(msg) => write!(f, "Scan panicked: {}", msg),
            SearchError::Upstream(msg) => write!(f, "Segment source failed: {}", msg),
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SearchError::Io(e) => Some(e),
            SearchError::InvalidRegex(e) => Some(e),
            SearchError::Settings(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SearchError {
    fn from(e: io::Error) -> Self {
        SearchError::Io(e)
    }
}

impl From<regex::Error> for SearchError {
    fn from(e: regex::Error) -> Self {
        SearchError::InvalidRegex(e)
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(e: serde_json::Error) -> Self {
        SearchError::Settings(e)
    }
}

/// Matching line starts found in `[range_start, range_end)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SegmentSearchResult {
    pub range_start: u64,
    pub range_end: u64,
    pub match_offsets: Vec<u64>,
}

impl SegmentSearchResult {
    pub fn new(range_start: u64, range_end: u64, match_offsets: Vec<u64>) -> Self {
        Self {
            range_start,
            range_end,
            match_offsets,
        }
    }

    pub fn empty(range_start: u64, range_end: u64) -> Self {
        Self::new(range_start, range_end, Vec::new())
    }

    pub fn count(&self) -> usize {
        self.match_offsets.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    Pending,
    Searching,
    Complete,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSearchState {
    pub segment: Segment,
    pub status: SearchStatus,
    pub result: Option<Arc<SegmentSearchResult>>,
}

impl SegmentSearchState {
    pub fn pending(segment: Segment) -> Self {
        Self {
            segment,
            status: SearchStatus::Pending,
            result: None,
        }
    }

    pub fn searching(segment: Segment) -> Self {
        Self {
            segment,
            status: SearchStatus::Searching,
            result: None,
        }
    }

    pub fn complete(segment: Segment, result: SegmentSearchResult) -> Self {
        Self {
            segment,
            status: SearchStatus::Complete,
            result: Some(Arc::new(result)),
        }
    }

    pub fn failed(segment: Segment, message: impl Into<String>) -> Self {
        Self {
            segment,
            status: SearchStatus::Failed {
                message: message.into(),
            },
            result: None,
        }
    }

    pub fn key(&self) -> SegmentKey {
        self.segment.key()
    }

    pub fn match_count(&self) -> usize {
        self.result.as_ref().map_or(0, |r| r.count())
    }

    pub fn is_pending(&self) -> bool {
        self.status == SearchStatus::Pending
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SearchStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    Add,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub reason: ChangeReason,
    pub state: SegmentSearchState,
}

#[derive(Debug)]
pub enum PipelineMessage {
    Snapshot(Arc<SearchSnapshot>),
    Error(SearchError),
}
