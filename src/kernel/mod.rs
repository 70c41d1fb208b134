//! Search core: snapshot model plus the services that produce it.

pub mod search;
pub mod services;

pub use search::SearchSnapshot;
