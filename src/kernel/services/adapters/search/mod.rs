//! 搜索管线模块
//!
//! - scanner: 区间扫描器（逐行读取 + predicate）
//! - store: 按区间索引的搜索状态，唯一的共享可变数据
//! - tail / head: 尾部增量扫描、历史区间调度
//! - aggregator: 把状态变更折叠成快照流
//! - pipeline: 组装以上组件

mod aggregator;
mod descriptors;
mod filter;
mod head;
mod metadata;
mod pipeline;
mod scanner;
mod store;
mod tail;

pub use aggregator::{Aggregator, TerminalError};
pub use descriptors::SegmentDescriptorStore;
pub use filter::{LineFilter, LinePredicate};
pub use head::HeadScheduler;
pub use metadata::MetadataCapture;
pub use pipeline::SearchPipeline;
pub use scanner::{open_shared, scan_range};
pub(crate) use scanner::trim_line_ending;
pub use store::SearchStateStore;
pub use tail::TailScanner;
