//! Staff accounts and roles.
//!
//! # Invariants
//! - `email` is stored lower-cased and trimmed.
//! - `role` decides which workflow operations a session may perform.

use super::{require_text, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email regex"));

pub type StaffId = Uuid;

/// Role assigned to every staff account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Front-of-house: seats tables, places orders, serves items.
    Server,
    /// Back-of-house: prepares order items.
    Kitchen,
    /// Billing, menu, staff and reports.
    Admin,
}

impl Role {
    /// Stable storage/wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Kitchen => "kitchen",
            Self::Admin => "admin",
        }
    }

    /// Parses a stable role value. Case-sensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "server" => Some(Self::Server),
            "kitchen" => Some(Self::Kitchen),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Staff account as visible to the rest of the core.
///
/// Credential material lives only in storage and never leaves the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl StaffMember {
    /// Creates an active staff member with a fresh id.
    pub fn new(email: &str, full_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            full_name: full_name.into().trim().to_string(),
            role,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("full_name", &self.full_name)?;
        if !EMAIL_RE.is_match(&self.email) {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}

/// Lower-cases and trims an email address for lookup and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{normalize_email, Role, StaffMember};
    use crate::model::ValidationError;

    #[test]
    fn role_values_are_stable() {
        for role in [Role::Server, Role::Kitchen, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("Admin"), None);
    }

    #[test]
    fn new_staff_normalizes_email() {
        let member = StaffMember::new("  Chef@Example.COM ", "Chef", Role::Kitchen);
        assert_eq!(member.email, "chef@example.com");
        assert!(member.validate().is_ok());
        assert_eq!(normalize_email("A@B"), "a@b");
    }

    #[test]
    fn validate_rejects_bad_email_and_blank_name() {
        let member = StaffMember::new("not-an-email", "Someone", Role::Server);
        assert!(matches!(
            member.validate(),
            Err(ValidationError::InvalidEmail(_))
        ));

        let member = StaffMember::new("a@b.c", "   ", Role::Server);
        assert_eq!(
            member.validate(),
            Err(ValidationError::EmptyField("full_name"))
        );
    }
}
