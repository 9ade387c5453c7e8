//! # catalog-auth
//!
//! Inherited access control for the data catalog:
//!
//! - [`acl::benefactor`]: finds the nearest ancestor (or the entity itself)
//!   that owns an ACL
//! - [`acl::checker`]: evaluates a benefactor's ACL for a set of principals

pub mod acl;

pub use acl::benefactor::{BenefactorResolver, LineageSnapshot};
pub use acl::checker::AccessChecker;
