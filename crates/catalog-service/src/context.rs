//! Request context carrying the acting principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::types::PrincipalId;

/// Context for the current request.
///
/// Passed into every mutating operation so that created/modified columns
/// record *who* acted and *when*.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The acting principal.
    pub principal_id: PrincipalId,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context stamped with the current time.
    pub fn new(principal_id: PrincipalId) -> Self {
        Self {
            principal_id,
            request_time: Utc::now(),
        }
    }
}
