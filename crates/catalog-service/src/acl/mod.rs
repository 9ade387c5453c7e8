//! Access-control list store.

pub mod service;

pub use service::AclStore;
