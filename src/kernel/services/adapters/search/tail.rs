//! 尾部扫描
//!
//! - 第一次：对尾部区间做完整扫描
//! - 之后：只对新追加的行调用 predicate，与上一次结果合并
//!
//! 在上游投递线程内同步执行，不另起任务。

use super::filter::LinePredicate;
use super::scanner::scan_range;
use super::store::SearchStateStore;
use crate::core::Service;
use crate::kernel::services::ports::search::{
    Result, SearchError, SegmentSearchResult, SegmentSearchState,
};
use crate::kernel::services::ports::{FileMetadata, SegmentKey, TailDescriptor, TailLine};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub struct TailScanner {
    store: Arc<SearchStateStore>,
    predicate: Arc<dyn LinePredicate>,
    last_descriptor: Option<TailDescriptor>,
    last_result: Option<SegmentSearchResult>,
}

impl TailScanner {
    pub fn new(store: Arc<SearchStateStore>, predicate: Arc<dyn LinePredicate>) -> Self {
        Self {
            store,
            predicate,
            last_descriptor: None,
            last_result: None,
        }
    }

    /// 处理一个尾部描述。返回是否写入了 store。
    ///
    /// 只有 Tail 未注册时返回错误；扫描失败会把 Tail 标记为 Failed，
    /// 下一次描述到来时重新做完整扫描。
    pub fn process(&mut self, metadata: &FileMetadata, tail: &TailDescriptor) -> Result<bool> {
        if self.last_descriptor.as_ref() == Some(tail) {
            return Ok(false);
        }
        self.last_descriptor = Some(tail.clone());

        if self.store.lookup(SegmentKey::Tail).is_none() {
            return Err(SearchError::MissingTailState);
        }

        let segment = tail.segment;
        let outcome = match (&self.last_result, &tail.appended) {
            (Some(prev), Some(lines)) if segment.start >= prev.range_start => {
                let predicate = &self.predicate;
                catch_unwind(AssertUnwindSafe(|| {
                    merge_appended(prev, segment.start, segment.end, lines, predicate.as_ref())
                }))
                .map_err(|panic| SearchError::ScanPanicked(panic_message(panic)))
            }
            _ => {
                tracing::debug!(start = segment.start, end = segment.end, "full tail scan");
                let predicate = &self.predicate;
                match catch_unwind(AssertUnwindSafe(|| {
                    scan_range(
                        &metadata.path,
                        metadata.encoding,
                        segment.start,
                        Some(segment.end),
                        predicate.as_ref(),
                    )
                })) {
                    Ok(Ok(result)) => Ok(result),
                    Ok(Err(e)) => Err(SearchError::Io(e)),
                    Err(panic) => Err(SearchError::ScanPanicked(panic_message(panic))),
                }
            }
        };

        match outcome {
            Ok(result) => {
                if self.last_result.as_ref() == Some(&result) {
                    tracing::trace!("tail result unchanged");
                    return Ok(false);
                }
                self.last_result = Some(result.clone());
                Ok(self
                    .store
                    .upsert(SegmentSearchState::complete(segment, result)))
            }
            Err(e) => {
                tracing::warn!(error = %e, "tail scan failed");
                self.last_result = None;
                Ok(self
                    .store
                    .upsert(SegmentSearchState::failed(segment, e.to_string())))
            }
        }
    }
}

impl Service for TailScanner {
    fn name(&self) -> &'static str {
        "TailScanner"
    }
}

/// 上一次结果中落在 `[start, 第一条新行)` 的偏移，加上新行中匹配的偏移。
///
/// 新行从上一次的未结束行开始重新给出，因此该行之后的旧偏移全部丢弃重算。
fn merge_appended(
    prev: &SegmentSearchResult,
    start: u64,
    end: u64,
    lines: &[TailLine],
    predicate: &dyn LinePredicate,
) -> SegmentSearchResult {
    let rescan_from = lines.first().map_or(u64::MAX, |line| line.offset);
    let mut offsets: Vec<u64> = prev
        .match_offsets
        .iter()
        .copied()
        .filter(|&offset| offset >= start && offset < rescan_from)
        .collect();

    for line in lines {
        if line.offset < start {
            continue;
        }
        if predicate.is_match(&line.text) {
            offsets.push(line.offset);
        }
    }

    SegmentSearchResult::new(start, end, offsets)
}

pub(crate) fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/tail.rs"]
mod tests;
