//! Read modes for organization-wide listings.

use serde::{Deserialize, Serialize};

/// How a listing decides which records the caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Organization admin read: every record in the organization, no
    /// per-item grant lookup. Callers must have authorized the requester at
    /// the organization level beforehand.
    NoAccessCheck,
    /// Only projects the user holds a grant on, and the secrets inside them.
    User,
}

impl AccessMode {
    /// Pick the mode for a caller based on their organization role.
    pub fn for_caller(is_org_admin: bool) -> Self {
        if is_org_admin {
            Self::NoAccessCheck
        } else {
            Self::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAccessCheck => "no_access_check",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
