use super::*;
use crate::kernel::services::ports::search::{
    ChangeReason, SegmentSearchResult, SegmentSearchState,
};
use crate::kernel::services::ports::{
    SegmentKey, SegmentNotification, SegmentSet, TailDescriptor, TextEncoding,
};
use crate::kernel::services::adapters::search::SearchStateStore;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

fn change(reason: ChangeReason, state: SegmentSearchState) -> StateChange {
    StateChange { reason, state }
}

fn notification(tail: Segment) -> SegmentNotification {
    SegmentNotification {
        segments: SegmentSet {
            path: PathBuf::from("app.log"),
            encoding: Some(TextEncoding::Utf8),
            file_size: tail.end,
            segments: vec![tail],
        },
        tail: TailDescriptor::full(tail),
    }
}

#[test]
fn test_fold_seeds_then_merges() {
    let metadata = Arc::new(MetadataCapture::new());
    let (tail_tx, tail_rx) = watch::channel(None);
    let mut aggregator = Aggregator::new(metadata.clone(), tail_rx);
    assert!(aggregator.current().is_none());

    let tail = Segment::tail(1, 100, 120);
    tail_tx.send_replace(Some(tail));
    metadata.observe(&notification(tail));

    let head = Segment::head(0, 0, 100);
    let first = aggregator.fold(&change(ChangeReason::Add, SegmentSearchState::pending(head)));
    assert_eq!(first.segment_count(), 1);
    assert_eq!(first.tail(), Some(&tail));
    assert_eq!(first.path(), Some(std::path::Path::new("app.log")));

    let second = aggregator.fold(&change(
        ChangeReason::Update,
        SegmentSearchState::complete(head, SegmentSearchResult::new(0, 100, vec![0, 50])),
    ));
    assert_eq!(second.total_matches(), 2);
    assert_eq!(second.segment_count(), 1);
    assert!(Arc::ptr_eq(aggregator.current().unwrap(), &second));
}

#[test]
fn test_fold_uses_latest_tail() {
    let (tail_tx, tail_rx) = watch::channel(None);
    let mut aggregator = Aggregator::new(Arc::new(MetadataCapture::new()), tail_rx);

    let snapshot = aggregator.fold(&change(
        ChangeReason::Add,
        SegmentSearchState::pending(Segment::head(0, 0, 10)),
    ));
    assert!(snapshot.tail().is_none());

    let tail = Segment::tail(1, 10, 40);
    tail_tx.send_replace(Some(tail));
    let snapshot = aggregator.fold(&change(
        ChangeReason::Add,
        SegmentSearchState::pending(tail),
    ));
    assert_eq!(snapshot.tail(), Some(&tail));
    assert!(snapshot.state(SegmentKey::Tail).is_some());
}

#[test]
fn test_spawn_emits_empty_then_one_snapshot_per_change() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let store = SearchStateStore::new();
    let (_tail_tx, tail_rx) = watch::channel(None);
    let (tx, rx) = mpsc::channel();

    let handle = Aggregator::new(Arc::new(MetadataCapture::new()), tail_rx).spawn(
        rt.handle(),
        store.subscribe(),
        tx,
    );

    match rx.try_recv().unwrap() {
        PipelineMessage::Snapshot(snapshot) => assert!(snapshot.is_empty()),
        other => panic!("unexpected message: {:?}", other),
    }

    let head = Segment::head(0, 0, 100);
    store.register(head);
    store.upsert(SegmentSearchState::searching(head));
    store.upsert(SegmentSearchState::complete(
        head,
        SegmentSearchResult::new(0, 100, vec![7]),
    ));

    let mut totals = Vec::new();
    for _ in 0..3 {
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            PipelineMessage::Snapshot(snapshot) => totals.push(snapshot.total_matches()),
            other => panic!("unexpected message: {:?}", other),
        }
    }
    assert_eq!(totals, vec![0, 0, 1]);

    // store 被 dispose 后变更流结束，任务退出并关闭通道
    store.dispose();
    rt.block_on(handle).unwrap();
    assert!(matches!(
        rx.recv_timeout(Duration::from_secs(1)),
        Err(mpsc::RecvTimeoutError::Disconnected)
    ));
}

#[test]
fn test_terminal_error_follows_buffered_changes() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let store = SearchStateStore::new();
    let (_tail_tx, tail_rx) = watch::channel(None);
    let (tx, rx) = mpsc::channel();

    let aggregator = Aggregator::new(Arc::new(MetadataCapture::new()), tail_rx);
    let terminal = aggregator.terminal();
    let changes = store.subscribe();

    // 任务启动前就积压大量变更
    for index in 0..500 {
        store.register(Segment::head(index, index as u64, index as u64 + 1));
    }
    assert!(terminal.set(SearchError::Upstream("gone".to_string())));
    assert!(!terminal.set(SearchError::MissingTailState));
    store.dispose();

    let handle = aggregator.spawn(rt.handle(), changes, tx);
    rt.block_on(handle).unwrap();

    let messages: Vec<PipelineMessage> = rx.try_iter().collect();
    assert_eq!(messages.len(), 1 + 500 + 1);
    assert!(matches!(
        messages.last(),
        Some(PipelineMessage::Error(SearchError::Upstream(message))) if message == "gone"
    ));
    let errors = messages
        .iter()
        .filter(|m| matches!(m, PipelineMessage::Error(_)))
        .count();
    assert_eq!(errors, 1);
    assert!(!terminal.is_set());
}

#[test]
fn test_dispose_without_error_ends_quietly() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let store = SearchStateStore::new();
    let (_tail_tx, tail_rx) = watch::channel(None);
    let (tx, rx) = mpsc::channel();

    let handle = Aggregator::new(Arc::new(MetadataCapture::new()), tail_rx).spawn(
        rt.handle(),
        store.subscribe(),
        tx,
    );
    store.register(Segment::head(0, 0, 10));
    store.dispose();
    rt.block_on(handle).unwrap();

    let messages: Vec<PipelineMessage> = rx.try_iter().collect();
    assert_eq!(messages.len(), 2);
    assert!(messages
        .iter()
        .all(|m| matches!(m, PipelineMessage::Snapshot(_))));
}
