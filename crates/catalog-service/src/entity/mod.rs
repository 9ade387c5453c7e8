//! Entity and revision store.

pub mod service;
pub mod tree;
pub mod version;

pub use service::EntityStore;
