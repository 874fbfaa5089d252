use serde::{Deserialize, Serialize};

/// A provider-agnostic actor identity.
///
/// Read-only and derived entirely from the originating VCS provider; never
/// holds credentials or access tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            name: name.into(),
            email: None,
        }
    }
}
