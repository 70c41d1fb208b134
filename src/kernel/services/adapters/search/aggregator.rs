//! 结果汇总
//!
//! 订阅 store 的变更流，每条变更与最新的尾部区间一起折叠成新的快照。
//! 输出通道只由这里写入；致命错误在变更流结束后发出，是最后一条消息。

use super::metadata::MetadataCapture;
use crate::core::Service;
use crate::kernel::services::ports::search::{PipelineMessage, SearchError, StateChange};
use crate::kernel::services::ports::Segment;
use crate::kernel::SearchSnapshot;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// 管线的致命错误，第一次写入生效
#[derive(Debug, Default)]
pub struct TerminalError {
    cell: Mutex<Option<SearchError>>,
}

impl TerminalError {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回是否写入；已有错误时忽略
    pub fn set(&self, error: SearchError) -> bool {
        let mut cell = self.cell.lock().unwrap_or_else(|e| e.into_inner());
        if cell.is_some() {
            return false;
        }
        *cell = Some(error);
        true
    }

    pub fn is_set(&self) -> bool {
        self.cell
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn take(&self) -> Option<SearchError> {
        self.cell.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

pub struct Aggregator {
    metadata: Arc<MetadataCapture>,
    tail: watch::Receiver<Option<Segment>>,
    snapshot: Option<Arc<SearchSnapshot>>,
    terminal: Arc<TerminalError>,
}

impl Aggregator {
    pub fn new(metadata: Arc<MetadataCapture>, tail: watch::Receiver<Option<Segment>>) -> Self {
        Self {
            metadata,
            tail,
            snapshot: None,
            terminal: Arc::new(TerminalError::new()),
        }
    }

    /// 写入后再 dispose store，变更流排空后该错误作为最后一条消息发出
    pub fn terminal(&self) -> Arc<TerminalError> {
        self.terminal.clone()
    }

    /// 折叠一条变更：第一条变更从零构建，之后在上一张快照上合并
    pub fn fold(&mut self, change: &StateChange) -> Arc<SearchSnapshot> {
        let tail = *self.tail.borrow();
        let metadata = self.metadata.get();
        let next = match &self.snapshot {
            None => SearchSnapshot::seed(metadata, &change.state, tail),
            Some(prev) => prev.merge(metadata, &change.state, tail),
        };
        let next = Arc::new(next);
        self.snapshot = Some(next.clone());
        next
    }

    pub fn current(&self) -> Option<&Arc<SearchSnapshot>> {
        self.snapshot.as_ref()
    }

    /// 立即发送一张空快照，然后在后台持续折叠变更。
    /// 变更流结束（store 被 dispose）时发出已记录的致命错误并退出；
    /// 接收端被丢弃时直接退出。
    pub fn spawn(
        mut self,
        runtime: &tokio::runtime::Handle,
        mut changes: UnboundedReceiver<StateChange>,
        tx: Sender<PipelineMessage>,
    ) -> JoinHandle<()> {
        let _ = tx.send(PipelineMessage::Snapshot(Arc::new(SearchSnapshot::empty())));

        runtime.spawn(async move {
            while let Some(change) = changes.recv().await {
                let snapshot = self.fold(&change);
                if tx.send(PipelineMessage::Snapshot(snapshot)).is_err() {
                    tracing::debug!("snapshot receiver dropped");
                    return;
                }
            }

            if let Some(error) = self.terminal.take() {
                let _ = tx.send(PipelineMessage::Error(error));
            }
        })
    }
}

impl Service for Aggregator {
    fn name(&self) -> &'static str {
        "Aggregator"
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/search/aggregator.rs"]
mod tests;
