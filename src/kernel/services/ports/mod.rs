//! Service ports: data contracts shared by the pipeline components.

pub mod config;
pub mod search;
pub mod segment;

pub use config::SearchSettings;
pub use search::{
    ChangeReason, PipelineMessage, Result, SearchError, SearchStatus, SegmentSearchResult,
    SegmentSearchState, StateChange,
};
pub use segment::{
    FileMetadata, Segment, SegmentKey, SegmentKind, SegmentMessage, SegmentNotification, SegmentSet,
    TailDescriptor, TailLine, TextEncoding,
};
