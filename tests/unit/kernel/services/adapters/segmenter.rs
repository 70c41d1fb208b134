use super::*;
use crate::kernel::services::ports::SegmentKind;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::mpsc;
use tempfile::tempdir;

fn append(path: &Path, text: &str) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(text.as_bytes()).unwrap();
}

/// 每行固定 10 字节
fn lines(count: usize) -> String {
    (0..count).map(|i| format!("line {:04}\n", i)).collect()
}

#[test]
fn test_empty_file_is_single_empty_tail() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "").unwrap();

    let mut segmenter = FileSegmenter::new(&path, TextEncoding::Utf8, 100);
    let notification = segmenter.poll().unwrap();

    assert_eq!(notification.segments.segments, vec![Segment::tail(0, 0, 0)]);
    assert_eq!(notification.segments.encoding, Some(TextEncoding::Utf8));
    assert_eq!(notification.tail, TailDescriptor::full(Segment::tail(0, 0, 0)));
}

#[test]
fn test_small_file_has_no_heads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, lines(5)).unwrap();

    let mut segmenter = FileSegmenter::new(&path, TextEncoding::Utf8, 100);
    let notification = segmenter.poll().unwrap();

    assert_eq!(notification.segments.segments, vec![Segment::tail(0, 0, 50)]);
    assert_eq!(notification.segments.file_size, 50);
}

#[test]
fn test_heads_are_line_aligned_and_contiguous() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, lines(100)).unwrap();

    let mut segmenter = FileSegmenter::new(&path, TextEncoding::Utf8, 300);
    let segments = segmenter.poll().unwrap().segments.segments;

    assert_eq!(
        segments,
        vec![
            Segment::head(0, 0, 310),
            Segment::head(1, 310, 620),
            Segment::head(2, 620, 930),
            Segment::tail(3, 930, 1000),
        ]
    );
    for pair in segments.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
    assert!(segments.iter().all(|s| s.start % 10 == 0));
    assert_eq!(segments.last().map(|s| s.kind), Some(SegmentKind::Tail));
}

#[test]
fn test_unchanged_file_repeats_notification() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, lines(3)).unwrap();

    let mut segmenter = FileSegmenter::new(&path, TextEncoding::Utf8, 100);
    let first = segmenter.poll().unwrap();
    let second = segmenter.poll().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_append_repeats_unterminated_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "a\nb\n").unwrap();

    let mut segmenter = FileSegmenter::new(&path, TextEncoding::Utf8, 1000);
    segmenter.poll().unwrap();

    append(&path, "ERROR c\r\npart");
    let notification = segmenter.poll().unwrap();
    assert_eq!(notification.tail.segment, Segment::tail(0, 0, 17));
    assert_eq!(
        notification.tail.appended,
        Some(vec![TailLine::new(4, "ERROR c"), TailLine::new(13, "part")])
    );

    append(&path, "ial");
    let notification = segmenter.poll().unwrap();
    assert_eq!(
        notification.tail.appended,
        Some(vec![TailLine::new(13, "partial")])
    );

    append(&path, "\nnext\n");
    let notification = segmenter.poll().unwrap();
    assert_eq!(
        notification.tail.appended,
        Some(vec![TailLine::new(13, "partial"), TailLine::new(21, "next")])
    );
}

#[test]
fn test_growth_carves_new_head() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, lines(5)).unwrap();

    let mut segmenter = FileSegmenter::new(&path, TextEncoding::Utf8, 100);
    assert_eq!(segmenter.poll().unwrap().segments.segments.len(), 1);

    append(&path, &lines(10));
    let notification = segmenter.poll().unwrap();
    assert_eq!(
        notification.segments.segments,
        vec![Segment::head(0, 0, 110), Segment::tail(1, 110, 150)]
    );
    assert_eq!(notification.tail.appended.as_ref().map(Vec::len), Some(10));
}

#[test]
fn test_shrink_requests_full_rescan() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, lines(5)).unwrap();

    let mut segmenter = FileSegmenter::new(&path, TextEncoding::Utf8, 100);
    segmenter.poll().unwrap();

    fs::write(&path, "").unwrap();
    let notification = segmenter.poll().unwrap();
    assert_eq!(notification.tail, TailDescriptor::full(Segment::tail(0, 0, 0)));

    append(&path, "ERROR\n");
    let notification = segmenter.poll().unwrap();
    assert_eq!(
        notification.tail.appended,
        Some(vec![TailLine::new(0, "ERROR")])
    );
}

#[test]
fn test_shrink_keeps_existing_heads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, lines(30)).unwrap();

    let mut segmenter = FileSegmenter::new(&path, TextEncoding::Utf8, 100);
    let before = segmenter.poll().unwrap().segments.segments;
    let head_count = before.iter().filter(|s| s.is_head()).count();
    assert!(head_count > 0);

    fs::write(&path, lines(2)).unwrap();
    let after = segmenter.poll().unwrap().segments.segments;
    assert_eq!(after.iter().filter(|s| s.is_head()).count(), head_count);
    let tail = after.last().copied().unwrap();
    assert!(tail.start <= 20 && tail.end == 20);
}

#[test]
fn test_missing_file_is_error() {
    let dir = tempdir().unwrap();
    let mut segmenter = FileSegmenter::new(dir.path().join("nope.log"), TextEncoding::Utf8, 100);
    assert!(segmenter.poll().is_err());
}

#[test]
fn test_polling_thread_reports_and_stops() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, lines(3)).unwrap();

    let (tx, rx) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_polling(
        FileSegmenter::new(&path, TextEncoding::Utf8, 100),
        tx,
        Duration::from_millis(10),
        stop.clone(),
    )
    .unwrap();

    match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
        SegmentMessage::Updated(notification) => {
            assert_eq!(notification.segments.file_size, 30)
        }
        other => panic!("unexpected message: {:?}", other),
    }

    stop.store(true, Ordering::Relaxed);
    handle.join().unwrap();
}

#[test]
fn test_polling_thread_reports_missing_file() {
    let dir = tempdir().unwrap();
    let (tx, rx) = mpsc::channel();
    let handle = spawn_polling(
        FileSegmenter::new(dir.path().join("nope.log"), TextEncoding::Utf8, 100),
        tx,
        Duration::from_millis(10),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();

    match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
        SegmentMessage::Error { message } => assert!(message.contains("nope.log")),
        other => panic!("unexpected message: {:?}", other),
    }
    handle.join().unwrap();
}
