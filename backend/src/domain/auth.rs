//! Verified caller identity.

use serde::{Deserialize, Serialize};

use super::user::Role;

/// Claims extracted from a verified bearer token.
///
/// The role is authoritative: account resolution persists it onto the user
/// record whenever it differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable subject issued by the identity provider.
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
}

impl Identity {
    /// Identity with only a subject and role.
    pub fn new(subject: impl Into<String>, role: Role) -> Self {
        Self {
            subject: subject.into(),
            email: None,
            display_name: None,
            role,
        }
    }
}
