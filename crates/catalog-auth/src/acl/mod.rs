//! Benefactor resolution and ACL evaluation.

pub mod benefactor;
pub mod checker;
