//! Access-control lists and access types.

pub mod access;
pub mod model;

pub use access::AccessType;
pub use model::{AccessControlList, ResourceAccess};
