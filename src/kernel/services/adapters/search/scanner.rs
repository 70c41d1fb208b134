//! 区间扫描器
//!
//! 逐行读取文件的 `[start, end)` 区间，记录匹配行的起始字节偏移。
//! 文件可能正在被追加或被截断，每次调用独立打开文件，不持有句柄。

use super::filter::LinePredicate;
use crate::kernel::services::ports::search::SegmentSearchResult;
use crate::kernel::services::ports::TextEncoding;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// 以共享只读方式打开，允许其他进程继续写入或删除文件
pub fn open_shared(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);

    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        use windows_sys::Win32::Storage::FileSystem::{
            FILE_SHARE_DELETE, FILE_SHARE_READ, FILE_SHARE_WRITE,
        };
        options.share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE);
    }

    options.open(path)
}

/// 扫描 `[start, end)`；`end == None` 表示读到文件末尾。
///
/// - `start` 超过当前文件长度（文件被截断或轮转）时，区间重置为 `[0, len)`
/// - 返回的 `range_end` 是实际读到的最后一行的结束位置，而非名义上的 `end`
pub fn scan_range(
    path: &Path,
    encoding: TextEncoding,
    start: u64,
    end: Option<u64>,
    predicate: &dyn LinePredicate,
) -> std::io::Result<SegmentSearchResult> {
    let file = open_shared(path)?;
    let len = file.metadata()?.len();

    let (start, end) = if start > len {
        tracing::debug!(
            path = %path.display(),
            start,
            len,
            "file shrank below scan start, rescanning from 0"
        );
        (0, Some(len))
    } else {
        (start, end)
    };

    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let mut position = reader.seek(SeekFrom::Start(start))?;
    if reader.fill_buf()?.is_empty() {
        return Ok(SegmentSearchResult::empty(start, end.unwrap_or(start)));
    }

    let mut buf = Vec::new();
    let mut matches = Vec::new();

    loop {
        if end.is_some_and(|end| position >= end) {
            break;
        }

        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }

        let line_start = position;
        position += n as u64;

        let line = trim_line_ending(&buf);
        if predicate.is_match(&encoding.decode(line)) {
            matches.push(line_start);
        }
    }

    Ok(SegmentSearchResult::new(start, position, matches))
}

pub(crate) fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/scanner.rs"]
mod tests;
