//! Sign-up, sign-in and session resolution.
//!
//! # Invariants
//! - Unknown email and wrong password are reported identically.
//! - Sessions of deactivated staff stop resolving immediately.
//! - Passwords and tokens never appear in log lines.

use super::{write_unit, ServiceError, ServiceResult};
use crate::auth::guard::Permission;
use crate::auth::password::{password_is_acceptable, PasswordHash};
use crate::auth::session::{new_session_token, Session, SESSION_TTL_MS};
use crate::auth::AuthError;
use crate::db::now_epoch_ms;
use crate::model::audit::AuditEntry;
use crate::model::staff::{normalize_email, Role, StaffMember};
use crate::realtime::{tables, ChangeFeed, Journal};
use crate::repo::audit_repo::{AuditRepository, SqliteAuditRepository};
use crate::repo::session_repo::{SessionRecord, SessionRepository, SqliteSessionRepository};
use crate::repo::staff_repo::{SqliteStaffRepository, StaffRepository};
use crate::repo::RepoError;
use log::{info, warn};
use rusqlite::Connection;
use serde_json::json;

/// Input for creating a staff account.
#[derive(Debug, Clone)]
pub struct NewStaff {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

pub struct AuthService<'a> {
    conn: &'a Connection,
    feed: &'a ChangeFeed,
}

impl<'a> AuthService<'a> {
    pub fn new(conn: &'a Connection, feed: &'a ChangeFeed) -> Self {
        Self { conn, feed }
    }

    /// Creates a staff account on behalf of an admin session.
    pub fn sign_up(&self, admin: &Session, new_staff: &NewStaff) -> ServiceResult<StaffMember> {
        admin.require(Permission::ManageStaff)?;
        write_unit(self.conn, self.feed, |conn, journal| {
            let member = register_staff(conn, journal, new_staff)?;
            let entry = AuditEntry::by(&admin.staff, "staff_created", "staff", Some(member.id))
                .with_details(json!({
                    "email": member.email,
                    "role": member.role.as_str(),
                }));
            SqliteAuditRepository::new(conn).append(&entry)?;
            Ok(member)
        })
    }

    pub fn sign_in(&self, email: &str, password: &str) -> ServiceResult<Session> {
        let email = normalize_email(email);
        let result = write_unit(self.conn, self.feed, |conn, _journal| {
            let staff_repo = SqliteStaffRepository::new(conn);
            let (member, hash) = staff_repo
                .find_credentials(&email)?
                .ok_or(AuthError::InvalidCredentials)?;
            if !hash.verify(password) {
                return Err(AuthError::InvalidCredentials.into());
            }
            if !member.is_active {
                return Err(AuthError::InactiveAccount.into());
            }

            let now = now_epoch_ms();
            let session_repo = SqliteSessionRepository::new(conn);
            session_repo.purge_expired(now)?;
            let record = SessionRecord {
                token: new_session_token(),
                staff_id: member.id,
                expires_at: now + SESSION_TTL_MS,
            };
            session_repo.create_session(&record)?;

            let entry = AuditEntry::by(&member, "sign_in", "staff", Some(member.id));
            SqliteAuditRepository::new(conn).append(&entry)?;

            Ok(Session {
                token: record.token,
                staff: member,
                expires_at: record.expires_at,
            })
        });

        match &result {
            Ok(session) => info!(
                "event=sign_in module=auth status=ok role={}",
                session.role().as_str()
            ),
            Err(err) => warn!(
                "event=sign_in module=auth status=error error_code={}",
                err.code()
            ),
        }
        result
    }

    /// Ends a session. Returns whether a session was actually removed.
    pub fn sign_out(&self, token: &str) -> ServiceResult<bool> {
        let removed = SqliteSessionRepository::new(self.conn).delete_session(token)?;
        info!("event=sign_out module=auth status=ok removed={removed}");
        Ok(removed)
    }

    /// Resolves a token into a live session.
    pub fn current_user(&self, token: &str) -> ServiceResult<Session> {
        let session_repo = SqliteSessionRepository::new(self.conn);
        let record = session_repo
            .find_session(token)?
            .ok_or(AuthError::InvalidSession)?;
        if now_epoch_ms() >= record.expires_at {
            session_repo.delete_session(token)?;
            return Err(AuthError::InvalidSession.into());
        }

        let member = SqliteStaffRepository::new(self.conn)
            .get_staff(record.staff_id)?
            .filter(|member| member.is_active)
            .ok_or(AuthError::InvalidSession)?;

        Ok(Session {
            token: record.token,
            staff: member,
            expires_at: record.expires_at,
        })
    }
}

/// Creates a staff account without a permission check.
///
/// Callers are the guarded `sign_up` and demo provisioning.
pub(crate) fn register_staff(
    conn: &Connection,
    journal: &mut Journal<'_>,
    new_staff: &NewStaff,
) -> ServiceResult<StaffMember> {
    if !password_is_acceptable(&new_staff.password) {
        return Err(AuthError::WeakPassword.into());
    }

    let member = StaffMember::new(&new_staff.email, new_staff.full_name.trim(), new_staff.role);
    let repo = SqliteStaffRepository::new(conn);
    match repo.create_staff(&member, &PasswordHash::derive(&new_staff.password)) {
        Ok(_) => {}
        Err(RepoError::Conflict(_)) => {
            return Err(ServiceError::Auth(AuthError::EmailTaken(member.email)))
        }
        Err(err) => return Err(err.into()),
    }

    let stored = repo
        .get_staff(member.id)?
        .ok_or_else(|| ServiceError::not_found("staff", member.id))?;
    journal.inserted(tables::STAFF, stored.id, &stored)?;
    info!(
        "event=staff_create module=auth status=ok role={}",
        stored.role.as_str()
    );
    Ok(stored)
}
