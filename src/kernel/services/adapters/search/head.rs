//! 历史区间调度
//!
//! - 按 index 从大到小扫描 Pending 的 Head 区间（离文件末尾越近越先扫）
//! - 同一时刻最多一个 Head 扫描在执行
//! - 匹配总数达到上限后，剩余区间直接标记为 Complete 且结果为空

use super::filter::LinePredicate;
use super::scanner::scan_range;
use super::store::SearchStateStore;
use super::tail::panic_message;
use crate::core::Service;
use crate::kernel::services::ports::search::{
    ChangeReason, SegmentSearchResult, SegmentSearchState,
};
use crate::kernel::services::ports::{FileMetadata, Segment};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub struct HeadScheduler {
    store: Arc<SearchStateStore>,
    metadata: FileMetadata,
    predicate: Arc<dyn LinePredicate>,
    match_cap: usize,
    cancelled: Arc<AtomicBool>,
    single_flight: Mutex<()>,
}

impl HeadScheduler {
    pub fn new(
        store: Arc<SearchStateStore>,
        metadata: FileMetadata,
        predicate: Arc<dyn LinePredicate>,
        match_cap: usize,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            metadata,
            predicate,
            match_cap,
            cancelled,
            single_flight: Mutex::new(()),
        }
    }

    /// 启动后台任务：先处理已有的 Pending 区间，之后每当有新的 Head
    /// 区间注册就再跑一轮。store 被 dispose 后任务结束。
    pub fn spawn(self, runtime: &tokio::runtime::Handle) -> JoinHandle<()> {
        let scheduler = Arc::new(self);
        // 先订阅再读取 pending，避免漏掉中间注册的区间
        let mut changes = scheduler.store.subscribe();

        runtime.spawn(async move {
            loop {
                scheduler.run_pass().await;
                if scheduler.is_cancelled() {
                    return;
                }

                loop {
                    match changes.recv().await {
                        None => return,
                        Some(change)
                            if change.reason == ChangeReason::Add
                                && change.state.segment.is_head() =>
                        {
                            break
                        }
                        Some(_) => continue,
                    }
                }
            }
        })
    }

    /// 扫描当前所有 Pending 的 Head 区间，返回处理的区间数
    pub async fn run_pass(&self) -> usize {
        let _guard = self.single_flight.lock().await;

        let pending = self.store.pending_heads();
        let mut processed = 0usize;
        for state in pending {
            if self.is_cancelled() {
                break;
            }
            self.process(state.segment).await;
            processed += 1;
        }
        processed
    }

    async fn process(&self, segment: Segment) {
        self.store.upsert(SegmentSearchState::searching(segment));

        let total = self.store.total_matches();
        if total >= self.match_cap {
            tracing::debug!(
                index = segment.index,
                total,
                cap = self.match_cap,
                "match cap reached, skipping head segment"
            );
            self.store.upsert(SegmentSearchState::complete(
                segment,
                SegmentSearchResult::empty(segment.start, segment.end),
            ));
            return;
        }

        let path = self.metadata.path.clone();
        let encoding = self.metadata.encoding;
        let predicate = self.predicate.clone();
        let result = tokio::task::spawn_blocking(move || {
            scan_range(
                &path,
                encoding,
                segment.start,
                Some(segment.end),
                predicate.as_ref(),
            )
        })
        .await;

        let state = match result {
            Ok(Ok(result)) => {
                tracing::debug!(
                    index = segment.index,
                    matches = result.count(),
                    "head segment scanned"
                );
                SegmentSearchState::complete(segment, result)
            }
            Ok(Err(e)) => {
                tracing::warn!(index = segment.index, error = %e, "head scan failed");
                SegmentSearchState::failed(segment, format!("IO error: {}", e))
            }
            Err(e) => {
                let message = if e.is_panic() {
                    format!("Scan panicked: {}", panic_message(e.into_panic()))
                } else {
                    format!("Head scan task failed: {}", e)
                };
                tracing::warn!(index = segment.index, %message, "head scan failed");
                SegmentSearchState::failed(segment, message)
            }
        };

        if self.is_cancelled() {
            return;
        }
        self.store.upsert(state);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Service for HeadScheduler {
    fn name(&self) -> &'static str {
        "HeadScheduler"
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/head.rs"]
mod tests;
