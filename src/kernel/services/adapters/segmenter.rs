//! Polling file segmenter.
//!
//! Splits the file into line-aligned Head segments of roughly `segment_size`
//! bytes and keeps one Tail segment for everything after the last Head. Each
//! poll reports the lines appended since the previous poll, plus any
//! unterminated last line, so the tail can be rescanned incrementally.

use super::search::{open_shared, trim_line_ending};
use crate::kernel::services::ports::{
    Segment, SegmentMessage, SegmentNotification, SegmentSet, TailDescriptor, TailLine,
    TextEncoding,
};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const CHUNK_SIZE: usize = 8192;

pub struct FileSegmenter {
    path: PathBuf,
    encoding: TextEncoding,
    segment_size: u64,
    heads: Vec<Segment>,
    tail_start: u64,
    /// End of the last complete line handed out.
    consumed: u64,
    file_size: u64,
    last: Option<SegmentNotification>,
}

impl FileSegmenter {
    pub fn new(path: impl Into<PathBuf>, encoding: TextEncoding, segment_size: u64) -> Self {
        Self {
            path: path.into(),
            encoding,
            segment_size: segment_size.max(1),
            heads: Vec::new(),
            tail_start: 0,
            consumed: 0,
            file_size: 0,
            last: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn poll(&mut self) -> io::Result<SegmentNotification> {
        let mut file = open_shared(&self.path)?;
        let len = file.metadata()?.len();

        if let Some(last) = &self.last {
            if len == self.file_size {
                return Ok(last.clone());
            }
        }

        let appended = if self.last.is_none() {
            self.consumed = last_line_end(&mut file, 0, len)?;
            None
        } else if len > self.file_size {
            Some(self.read_appended(&mut file, len)?)
        } else {
            tracing::debug!(path = %self.path.display(), len, "file shrank");
            self.tail_start = self.tail_start.min(len);
            self.consumed = last_line_end(&mut file, self.tail_start, len)?;
            None
        };
        self.file_size = len;

        while self.consumed - self.tail_start > self.segment_size {
            let target = self.tail_start + self.segment_size;
            let boundary = next_line_start(&mut file, target, self.consumed)?
                .unwrap_or(self.consumed);
            let head = Segment::head(self.heads.len(), self.tail_start, boundary);
            tracing::trace!(
                index = head.index,
                start = head.start,
                end = head.end,
                "head segment carved"
            );
            self.heads.push(head);
            self.tail_start = boundary;
        }

        let tail = Segment::tail(self.heads.len(), self.tail_start, len);
        let mut segments = self.heads.clone();
        segments.push(tail);

        let notification = SegmentNotification {
            segments: SegmentSet {
                path: self.path.clone(),
                encoding: Some(self.encoding),
                file_size: len,
                segments,
            },
            tail: match appended {
                Some(lines) => TailDescriptor::incremental(tail, lines),
                None => TailDescriptor::full(tail),
            },
        };
        self.last = Some(notification.clone());
        Ok(notification)
    }

    /// Lines in `[consumed, len)`. A trailing partial line is reported too but
    /// `consumed` stops before it, so the next poll reports it again.
    fn read_appended(&mut self, file: &mut File, len: u64) -> io::Result<Vec<TailLine>> {
        file.seek(SeekFrom::Start(self.consumed))?;
        let mut bytes = Vec::with_capacity((len - self.consumed) as usize);
        file.take(len - self.consumed).read_to_end(&mut bytes)?;

        let mut lines = Vec::new();
        let mut line_start = 0usize;
        while let Some(pos) = memchr::memchr(b'\n', &bytes[line_start..]) {
            let line_end = line_start + pos + 1;
            let line = trim_line_ending(&bytes[line_start..line_end]);
            lines.push(TailLine::new(
                self.consumed + line_start as u64,
                self.encoding.decode(line),
            ));
            line_start = line_end;
        }
        if line_start < bytes.len() {
            let partial = trim_line_ending(&bytes[line_start..]);
            lines.push(TailLine::new(
                self.consumed + line_start as u64,
                self.encoding.decode(partial),
            ));
        }
        self.consumed += line_start as u64;
        Ok(lines)
    }
}

/// Offset just past the first `\n` at or after `from`, searching below `limit`.
fn next_line_start(file: &mut File, from: u64, limit: u64) -> io::Result<Option<u64>> {
    file.seek(SeekFrom::Start(from))?;
    let mut buf = [0u8; CHUNK_SIZE];
    let mut position = from;
    while position < limit {
        let want = CHUNK_SIZE.min((limit - position) as usize);
        let n = file.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        if let Some(pos) = memchr::memchr(b'\n', &buf[..n]) {
            return Ok(Some(position + pos as u64 + 1));
        }
        position += n as u64;
    }
    Ok(None)
}

/// Offset just past the last `\n` in `[from, to)`, or `from` if there is none.
fn last_line_end(file: &mut File, from: u64, to: u64) -> io::Result<u64> {
    let mut buf = [0u8; CHUNK_SIZE];
    let mut end = to;
    while end > from {
        let start = end.saturating_sub(CHUNK_SIZE as u64).max(from);
        let want = (end - start) as usize;
        file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut buf[..want])?;
        if let Some(pos) = memchr::memrchr(b'\n', &buf[..want]) {
            return Ok(start + pos as u64 + 1);
        }
        end = start;
    }
    Ok(from)
}

/// Polls `segmenter` every `interval` on a dedicated thread, feeding the
/// pipeline's upstream channel until `cancelled` is set or the receiver is gone.
pub fn spawn_polling(
    mut segmenter: FileSegmenter,
    tx: Sender<SegmentMessage>,
    interval: Duration,
    cancelled: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("zscan-segmenter".to_string())
        .spawn(move || {
            while !cancelled.load(Ordering::Relaxed) {
                let message = match segmenter.poll() {
                    Ok(notification) => SegmentMessage::Updated(notification),
                    Err(e) => {
                        let _ = tx.send(SegmentMessage::Error {
                            message: format!("{}: {}", segmenter.path().display(), e),
                        });
                        return;
                    }
                };
                if tx.send(message).is_err() {
                    return;
                }
                std::thread::sleep(interval);
            }
        })
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/segmenter.rs"]
mod tests;
