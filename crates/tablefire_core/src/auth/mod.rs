//! Staff authentication and access control.
//!
//! # Responsibility
//! - Derive and verify salted password digests.
//! - Represent signed-in sessions.
//! - Guard workflow operations by role, deny by default.

use crate::auth::guard::Permission;
use crate::model::staff::Role;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod guard;
pub mod password;
pub mod session;

/// Authentication and authorization failures.
#[derive(Debug)]
pub enum AuthError {
    /// Unknown email or wrong password; deliberately indistinguishable.
    InvalidCredentials,
    /// Account exists but has been deactivated.
    InactiveAccount,
    /// Token unknown or expired.
    InvalidSession,
    /// An account with this email already exists.
    EmailTaken(String),
    /// Password does not satisfy the length policy.
    WeakPassword,
    PermissionDenied { role: Role, permission: Permission },
    Repo(RepoError),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::InactiveAccount => write!(f, "staff account is inactive"),
            Self::InvalidSession => write!(f, "session is invalid or expired"),
            Self::EmailTaken(email) => write!(f, "email already registered: {email}"),
            Self::WeakPassword => write!(
                f,
                "password must be at least {} characters",
                password::MIN_PASSWORD_CHARS
            ),
            Self::PermissionDenied { role, permission } => write!(
                f,
                "role `{}` is not allowed to {}",
                role.as_str(),
                permission
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AuthError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}
