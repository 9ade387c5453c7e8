//! The change log: one row per changed object, strictly increasing numbers.

pub mod batch;
pub mod service;

pub use batch::sort_batch;
pub use service::ChangeLog;
