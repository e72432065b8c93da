//! Authenticated staff sessions.
//!
//! # Invariants
//! - A session is valid only while `now < expires_at`.
//! - Tokens are opaque random values; they carry no staff data.

use super::guard::{role_allows, Permission};
use super::AuthError;
use crate::model::staff::{Role, StaffId, StaffMember};
use log::warn;
use uuid::Uuid;

/// Session lifetime after sign-in.
pub const SESSION_TTL_MS: i64 = 12 * 60 * 60 * 1000;

/// Resolved session: token plus the staff member it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub staff: StaffMember,
    pub expires_at: i64,
}

impl Session {
    pub fn staff_id(&self) -> StaffId {
        self.staff.id
    }

    pub fn role(&self) -> Role {
        self.staff.role
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }

    /// Fails with `PermissionDenied` unless this session's role holds `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), AuthError> {
        if role_allows(self.staff.role, permission) {
            return Ok(());
        }

        warn!(
            "event=permission_denied module=auth status=denied role={} permission={}",
            self.staff.role.as_str(),
            permission
        );
        Err(AuthError::PermissionDenied {
            role: self.staff.role,
            permission,
        })
    }
}

/// Generates a fresh opaque session token.
pub fn new_session_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::{new_session_token, Session, SESSION_TTL_MS};
    use crate::auth::guard::Permission;
    use crate::auth::AuthError;
    use crate::model::staff::{Role, StaffMember};

    fn session(role: Role) -> Session {
        Session {
            token: new_session_token(),
            staff: StaffMember::new("x@y.z", "X", role),
            expires_at: SESSION_TTL_MS,
        }
    }

    #[test]
    fn require_denies_unlisted_permissions() {
        let kitchen = session(Role::Kitchen);
        assert!(kitchen.require(Permission::PrepareItem).is_ok());
        assert!(matches!(
            kitchen.require(Permission::BillTable),
            Err(AuthError::PermissionDenied {
                role: Role::Kitchen,
                permission: Permission::BillTable
            })
        ));
    }

    #[test]
    fn expiry_is_exclusive() {
        let server = session(Role::Server);
        assert!(!server.is_expired(SESSION_TTL_MS - 1));
        assert!(server.is_expired(SESSION_TTL_MS));
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(new_session_token(), new_session_token());
    }
}
