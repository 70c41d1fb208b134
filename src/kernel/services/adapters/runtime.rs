use super::search::{LinePredicate, SearchPipeline};
use super::segmenter::{spawn_polling, FileSegmenter};
use crate::kernel::services::ports::{SearchSettings, SegmentMessage};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

const WORKER_THREADS: usize = 2;

/// Owns the tokio runtime the pipelines run on.
pub struct SearchRuntime {
    runtime: tokio::runtime::Runtime,
}

impl SearchRuntime {
    pub fn new() -> std::io::Result<Self> {
        Self::with_worker_threads(WORKER_THREADS)
    }

    pub fn with_worker_threads(worker_threads: usize) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("zscan-worker")
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    pub fn tokio_handle(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }

    /// Starts a pipeline fed by the returned sender.
    pub fn start(
        &self,
        predicate: Arc<dyn LinePredicate>,
        settings: &SearchSettings,
    ) -> (Sender<SegmentMessage>, SearchPipeline) {
        let (tx, rx) = mpsc::channel();
        let pipeline = SearchPipeline::spawn(self.runtime.handle(), rx, predicate, settings);
        (tx, pipeline)
    }

    /// Starts a pipeline over `path`, polled by a [`FileSegmenter`] until the
    /// returned flag is set or the pipeline is dropped.
    pub fn watch_file(
        &self,
        path: PathBuf,
        predicate: Arc<dyn LinePredicate>,
        settings: &SearchSettings,
    ) -> std::io::Result<(SearchPipeline, Arc<AtomicBool>)> {
        let (tx, pipeline) = self.start(predicate, settings);
        let stop = Arc::new(AtomicBool::new(false));
        let segmenter = FileSegmenter::new(path, settings.encoding, settings.segment_size);
        spawn_polling(segmenter, tx, settings.poll_interval(), stop.clone())?;
        Ok((pipeline, stop))
    }
}
