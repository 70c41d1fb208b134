use std::borrow::Cow;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Head,
    Tail,
}

/// A byte range `[start, end)` of the target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    pub index: usize,
    pub start: u64,
    pub end: u64,
    pub kind: SegmentKind,
}

impl Segment {
    pub fn head(index: usize, start: u64, end: u64) -> Self {
        Self {
            index,
            start,
            end,
            kind: SegmentKind::Head,
        }
    }

    pub fn tail(index: usize, start: u64, end: u64) -> Self {
        Self {
            index,
            start,
            end,
            kind: SegmentKind::Tail,
        }
    }

    pub fn key(&self) -> SegmentKey {
        match self.kind {
            SegmentKind::Head => SegmentKey::Head(self.index),
            SegmentKind::Tail => SegmentKey::Tail,
        }
    }

    pub fn is_head(&self) -> bool {
        self.kind == SegmentKind::Head
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identity of a segment inside the state store.
///
/// Heads order by index and the tail sorts after every head, so iterating keys
/// walks the file from the oldest data to the live edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentKey {
    Head(usize),
    Tail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
    Ascii,
}

impl TextEncoding {
    /// Decodes one line. Every supported encoding is ASCII compatible, so the
    /// caller splits on `\n` at the byte level before decoding.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes),
            TextEncoding::Latin1 => match std::str::from_utf8(bytes) {
                Ok(s) if s.is_ascii() => Cow::Borrowed(s),
                _ => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
            },
            TextEncoding::Ascii => {
                if bytes.is_ascii() {
                    // ASCII bytes are always valid UTF-8.
                    Cow::Borrowed(std::str::from_utf8(bytes).unwrap_or_default())
                } else {
                    Cow::Owned(
                        bytes
                            .iter()
                            .map(|&b| if b.is_ascii() { b as char } else { '\u{FFFD}' })
                            .collect(),
                    )
                }
            }
        }
    }
}

/// A line appended to the tail since the previous notification.
///
/// The last line of a batch may be unterminated; it is sent again, possibly
/// longer, at the head of the next batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailLine {
    pub offset: u64,
    pub text: String,
}

impl TailLine {
    pub fn new(offset: u64, text: impl Into<String>) -> Self {
        Self {
            offset,
            text: text.into(),
        }
    }
}

/// Current live edge of the file.
///
/// `appended` is `None` when the producer has no incremental view (first
/// notification, or the file shrank) and the tail must be rescanned in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailDescriptor {
    pub segment: Segment,
    pub appended: Option<Vec<TailLine>>,
}

impl TailDescriptor {
    pub fn full(segment: Segment) -> Self {
        Self {
            segment,
            appended: None,
        }
    }

    pub fn incremental(segment: Segment, appended: Vec<TailLine>) -> Self {
        Self {
            segment,
            appended: Some(appended),
        }
    }
}

/// Path and encoding of the searched file, fixed for the pipeline's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub path: PathBuf,
    pub encoding: TextEncoding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSet {
    pub path: PathBuf,
    /// `None` until the producer knows how to decode the file.
    pub encoding: Option<TextEncoding>,
    pub file_size: u64,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentNotification {
    pub segments: SegmentSet,
    pub tail: TailDescriptor,
}

#[derive(Debug, Clone)]
pub enum SegmentMessage {
    Updated(SegmentNotification),
    Error { message: String },
}
