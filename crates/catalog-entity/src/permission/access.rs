//! Access type enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A permission that an ACL can grant to a principal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "access_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessType {
    Create,
    Read,
    Update,
    Delete,
    ChangePermissions,
    Download,
    Upload,
    ChangeSettings,
    Moderate,
    SendMessage,
}

impl AccessType {
    /// All access types, in declaration order.
    pub const ALL: [AccessType; 10] = [
        Self::Create,
        Self::Read,
        Self::Update,
        Self::Delete,
        Self::ChangePermissions,
        Self::Download,
        Self::Upload,
        Self::ChangeSettings,
        Self::Moderate,
        Self::SendMessage,
    ];

    /// Return the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::ChangePermissions => "CHANGE_PERMISSIONS",
            Self::Download => "DOWNLOAD",
            Self::Upload => "UPLOAD",
            Self::ChangeSettings => "CHANGE_SETTINGS",
            Self::Moderate => "MODERATE",
            Self::SendMessage => "SEND_MESSAGE",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = catalog_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == wanted)
            .ok_or_else(|| catalog_core::AppError::validation(format!("Invalid access type: '{s}'")))
    }
}
