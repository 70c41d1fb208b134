//! Service adapters: OS/runtime specific implementations (IO/async).

pub mod runtime;
pub mod search;
pub mod segmenter;
pub mod settings;

pub use runtime::SearchRuntime;
pub use search::{
    scan_range, Aggregator, HeadScheduler, LineFilter, LinePredicate, MetadataCapture,
    SearchPipeline, SearchStateStore, SegmentDescriptorStore, TailScanner, TerminalError,
};
pub use segmenter::{spawn_polling, FileSegmenter};
pub use settings::{
    ensure_log_dir, ensure_settings_file, get_log_dir, get_settings_path, load_or_init_settings,
    load_settings, load_settings_or_default,
};
