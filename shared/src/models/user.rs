//! User roles

use serde::{Deserialize, Serialize};

/// Access role carried by an authenticated session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

impl UserRole {
    /// Anything other than `admin` is a standard user
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("admin") {
            UserRole::Admin
        } else {
            UserRole::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }

    /// Purchase prices and margins are visible to administrators only
    pub fn can_see_costs(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}
