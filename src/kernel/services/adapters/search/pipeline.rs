//! 搜索管线
//!
//! 上游投递线程：元数据捕获 → 区间去重注册 → 尾部扫描（同步）
//! 后台任务：Head 调度、结果汇总
//!
//! `SearchPipeline` 被 cancel 或 drop 时整条管线停止，进行中的扫描结果不会再写回。

use super::aggregator::{Aggregator, TerminalError};
use super::descriptors::SegmentDescriptorStore;
use super::filter::LinePredicate;
use super::head::HeadScheduler;
use super::metadata::MetadataCapture;
use super::store::SearchStateStore;
use super::tail::TailScanner;
use crate::core::Service;
use crate::kernel::services::ports::search::{PipelineMessage, Result, SearchError};
use crate::kernel::services::ports::{SearchSettings, Segment, SegmentMessage, SegmentNotification};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// 上游通道的轮询间隔，决定 cancel 后上游线程最迟多久退出
const UPSTREAM_POLL_INTERVAL: Duration = Duration::from_millis(50);

static PIPELINE_ID: AtomicU64 = AtomicU64::new(0);

fn next_pipeline_id() -> u64 {
    PIPELINE_ID.fetch_add(1, Ordering::Relaxed)
}

pub struct SearchPipeline {
    id: u64,
    cancelled: Arc<AtomicBool>,
    store: Arc<SearchStateStore>,
    rx: Receiver<PipelineMessage>,
}

impl SearchPipeline {
    pub fn spawn(
        runtime: &tokio::runtime::Handle,
        upstream: Receiver<SegmentMessage>,
        predicate: Arc<dyn LinePredicate>,
        settings: &SearchSettings,
    ) -> Self {
        let id = next_pipeline_id();
        let store = Arc::new(SearchStateStore::new());
        let metadata = Arc::new(MetadataCapture::new());
        let cancelled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let (tail_tx, tail_rx) = watch::channel(None);

        let aggregator = Aggregator::new(metadata.clone(), tail_rx);
        let terminal = aggregator.terminal();
        aggregator.spawn(runtime, store.subscribe(), tx);

        let delivery = UpstreamDelivery {
            id,
            runtime: runtime.clone(),
            store: store.clone(),
            metadata,
            descriptors: SegmentDescriptorStore::new(),
            tail_scanner: TailScanner::new(store.clone(), predicate.clone()),
            predicate,
            match_cap: settings.match_cap,
            tail_tx,
            terminal,
            cancelled: cancelled.clone(),
            head: None,
        };
        runtime.spawn_blocking(move || delivery.run(upstream));

        tracing::debug!(pipeline = id, match_cap = settings.match_cap, "search pipeline started");

        Self {
            id,
            cancelled,
            store,
            rx,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn recv(&self) -> Option<PipelineMessage> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<PipelineMessage, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> std::result::Result<PipelineMessage, TryRecvError> {
        self.rx.try_recv()
    }

    pub fn store(&self) -> &SearchStateStore {
        &self.store
    }

    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::Relaxed) {
            tracing::debug!(pipeline = self.id, "search pipeline cancelled");
        }
        self.store.dispose();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Drop for SearchPipeline {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Service for SearchPipeline {
    fn name(&self) -> &'static str {
        "SearchPipeline"
    }
}

/// 运行在上游投递线程上的部分
struct UpstreamDelivery {
    id: u64,
    runtime: tokio::runtime::Handle,
    store: Arc<SearchStateStore>,
    metadata: Arc<MetadataCapture>,
    descriptors: SegmentDescriptorStore,
    tail_scanner: TailScanner,
    predicate: Arc<dyn LinePredicate>,
    match_cap: usize,
    tail_tx: watch::Sender<Option<Segment>>,
    terminal: Arc<TerminalError>,
    cancelled: Arc<AtomicBool>,
    head: Option<JoinHandle<()>>,
}

impl UpstreamDelivery {
    fn run(mut self, upstream: Receiver<SegmentMessage>) {
        while !self.cancelled.load(Ordering::Relaxed) {
            match upstream.recv_timeout(UPSTREAM_POLL_INTERVAL) {
                Ok(SegmentMessage::Updated(notification)) => {
                    if let Err(e) = self.deliver(&notification) {
                        self.fail(e);
                        break;
                    }
                }
                Ok(SegmentMessage::Error { message }) => {
                    self.fail(SearchError::Upstream(message));
                    break;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!(pipeline = self.id, "segment source closed");
                    break;
                }
            }
        }
    }

    fn deliver(&mut self, notification: &SegmentNotification) -> Result<()> {
        if self.metadata.observe(notification) {
            tracing::info!(
                pipeline = self.id,
                path = %notification.segments.path.display(),
                "file metadata captured"
            );
        }

        self.tail_tx.send_replace(Some(notification.tail.segment));

        if let Some(segments) = self.descriptors.observe(notification) {
            for segment in segments {
                self.store.register(*segment);
            }
        }

        let Some(metadata) = self.metadata.get() else {
            tracing::trace!(pipeline = self.id, "encoding unknown, deferring scans");
            return Ok(());
        };

        if self.head.is_none() {
            let scheduler = HeadScheduler::new(
                self.store.clone(),
                metadata.clone(),
                self.predicate.clone(),
                self.match_cap,
                self.cancelled.clone(),
            );
            tracing::debug!(pipeline = self.id, service = scheduler.name(), "starting");
            self.head = Some(scheduler.spawn(&self.runtime));
        }

        self.tail_scanner.process(metadata, &notification.tail)?;
        Ok(())
    }

    /// 记录错误后 dispose store；错误由 Aggregator 在排空变更后发出
    fn fail(&self, error: SearchError) {
        tracing::error!(pipeline = self.id, error = %error, "search pipeline failed");
        self.terminal.set(error);
        self.cancelled.store(true, Ordering::Relaxed);
        self.store.dispose();
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/pipeline.rs"]
mod tests;
