//! Row locking and optimistic concurrency checks.

pub mod controller;

pub use controller::{ConcurrencyController, EntityLock};
