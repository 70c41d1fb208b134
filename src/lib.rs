//! zscan - 大型增长文件的增量搜索库
//!
//! 模块结构：
//! - core: 核心抽象（Service）
//! - kernel: 搜索快照、数据契约（ports）与管线实现（adapters）
//! - logging: tracing 初始化

pub mod core;
pub mod kernel;
pub mod logging;
