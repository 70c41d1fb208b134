//! Services layer (ports + adapters).
//!
//! - `ports`: pure contracts/types shared by the pipeline.
//! - `adapters`: file IO, the tokio runtime and the pipeline components.

pub mod adapters;
pub mod ports;
