//! 核心抽象
//!
//! - Service: 管线组件的统一命名

pub mod service;

pub use service::Service;
