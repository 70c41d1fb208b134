use crate::kernel::services::ports::{
    FileMetadata, SearchStatus, Segment, SegmentKey, SegmentSearchState, TextEncoding,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Immutable view of every segment's search state.
///
/// A new snapshot is always derived from the previous one plus a single
/// changed state; results are shared through `Arc`, so deriving one only
/// copies the per-segment headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSnapshot {
    states: BTreeMap<SegmentKey, SegmentSearchState>,
    tail: Option<Segment>,
    path: Option<PathBuf>,
    encoding: Option<TextEncoding>,
    total_matches: usize,
    failed: usize,
}

impl SearchSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// First snapshot built from real data.
    pub fn seed(
        metadata: Option<&FileMetadata>,
        state: &SegmentSearchState,
        tail: Option<Segment>,
    ) -> Self {
        let mut snapshot = Self::empty();
        snapshot.apply(metadata, state, tail);
        snapshot
    }

    pub fn merge(
        &self,
        metadata: Option<&FileMetadata>,
        state: &SegmentSearchState,
        tail: Option<Segment>,
    ) -> Self {
        let mut snapshot = self.clone();
        snapshot.apply(metadata, state, tail);
        snapshot
    }

    fn apply(
        &mut self,
        metadata: Option<&FileMetadata>,
        state: &SegmentSearchState,
        tail: Option<Segment>,
    ) {
        if self.path.is_none() {
            if let Some(metadata) = metadata {
                self.path = Some(metadata.path.clone());
                self.encoding = Some(metadata.encoding);
            }
        }
        if tail.is_some() {
            self.tail = tail;
        }

        if let Some(previous) = self.states.insert(state.key(), state.clone()) {
            self.total_matches -= previous.match_count();
            if previous.is_failed() {
                self.failed -= 1;
            }
        }
        self.total_matches += state.match_count();
        if state.is_failed() {
            self.failed += 1;
        }
    }

    pub fn total_matches(&self) -> usize {
        self.total_matches
    }

    pub fn failed_count(&self) -> usize {
        self.failed
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// States ordered from the start of the file to the tail.
    pub fn states(&self) -> impl Iterator<Item = &SegmentSearchState> {
        self.states.values()
    }

    pub fn state(&self, key: SegmentKey) -> Option<&SegmentSearchState> {
        self.states.get(&key)
    }

    pub fn segment_count(&self) -> usize {
        self.states.len()
    }

    /// All matching line offsets, ascending.
    pub fn match_offsets(&self) -> Vec<u64> {
        let mut offsets: Vec<u64> = self
            .states
            .values()
            .filter_map(|s| s.result.as_ref())
            .flat_map(|r| r.match_offsets.iter().copied())
            .collect();
        offsets.sort_unstable();
        offsets
    }

    /// Any segment still waiting for, or in the middle of, a scan.
    pub fn is_searching(&self) -> bool {
        self.states
            .values()
            .any(|s| matches!(s.status, SearchStatus::Pending | SearchStatus::Searching))
    }

    pub fn tail(&self) -> Option<&Segment> {
        self.tail.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn encoding(&self) -> Option<TextEncoding> {
        self.encoding
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/search.rs"]
mod tests;
