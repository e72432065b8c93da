//! Staff account repository.
//!
//! # Invariants
//! - Emails are unique and looked up in normalized form.
//! - Credential material is only returned by `find_credentials`.

use super::{
    bool_to_int, map_constraint, parse_enum, parse_flag, parse_uuid, RepoError, RepoResult,
};
use crate::auth::password::PasswordHash;
use crate::model::staff::{normalize_email, Role, StaffId, StaffMember};
use rusqlite::{params, Connection, OptionalExtension, Row};

const STAFF_SELECT_SQL: &str = "SELECT
    id,
    email,
    full_name,
    role,
    is_active,
    created_at,
    updated_at
FROM staff";

pub trait StaffRepository {
    fn create_staff(&self, member: &StaffMember, password: &PasswordHash) -> RepoResult<StaffId>;
    fn get_staff(&self, id: StaffId) -> RepoResult<Option<StaffMember>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<StaffMember>>;
    /// Returns the member and stored credentials for sign-in.
    fn find_credentials(&self, email: &str) -> RepoResult<Option<(StaffMember, PasswordHash)>>;
    /// Lists staff sorted by role then name.
    fn list_staff(&self) -> RepoResult<Vec<StaffMember>>;
    fn set_active(&self, id: StaffId, is_active: bool) -> RepoResult<()>;
}

pub struct SqliteStaffRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStaffRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl StaffRepository for SqliteStaffRepository<'_> {
    fn create_staff(&self, member: &StaffMember, password: &PasswordHash) -> RepoResult<StaffId> {
        member.validate()?;

        self.conn
            .execute(
                "INSERT INTO staff (
                    id,
                    email,
                    full_name,
                    role,
                    password_salt,
                    password_digest,
                    is_active
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    member.id.to_string(),
                    member.email.as_str(),
                    member.full_name.as_str(),
                    member.role.as_str(),
                    password.salt.as_str(),
                    password.digest.as_str(),
                    bool_to_int(member.is_active),
                ],
            )
            .map_err(|err| map_constraint(err, format!("staff email `{}`", member.email)))?;

        Ok(member.id)
    }

    fn get_staff(&self, id: StaffId) -> RepoResult<Option<StaffMember>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STAFF_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_staff_row(row)?));
        }
        Ok(None)
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<StaffMember>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STAFF_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([normalize_email(email)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_staff_row(row)?));
        }
        Ok(None)
    }

    fn find_credentials(&self, email: &str) -> RepoResult<Option<(StaffMember, PasswordHash)>> {
        let Some(member) = self.find_by_email(email)? else {
            return Ok(None);
        };

        let password = self
            .conn
            .query_row(
                "SELECT password_salt, password_digest FROM staff WHERE id = ?1;",
                [member.id.to_string()],
                |row| {
                    Ok(PasswordHash {
                        salt: row.get(0)?,
                        digest: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| RepoError::not_found("staff", member.id))?;

        Ok(Some((member, password)))
    }

    fn list_staff(&self) -> RepoResult<Vec<StaffMember>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STAFF_SELECT_SQL}
             ORDER BY
                CASE role WHEN 'admin' THEN 0 WHEN 'server' THEN 1 ELSE 2 END,
                full_name COLLATE NOCASE ASC,
                id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_staff_row(row)?);
        }
        Ok(members)
    }

    fn set_active(&self, id: StaffId, is_active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE staff
             SET
                is_active = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), bool_to_int(is_active)],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("staff", id));
        }
        Ok(())
    }
}

pub(crate) fn parse_staff_row(row: &Row<'_>) -> RepoResult<StaffMember> {
    let id: String = row.get("id")?;
    let role: String = row.get("role")?;
    let is_active: i64 = row.get("is_active")?;

    Ok(StaffMember {
        id: parse_uuid(&id, "staff.id")?,
        email: row.get("email")?,
        full_name: row.get("full_name")?,
        role: parse_enum(&role, "staff.role", Role::parse)?,
        is_active: parse_flag(is_active, "staff.is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
