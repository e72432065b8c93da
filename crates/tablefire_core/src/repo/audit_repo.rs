//! Audit log repository. Append-only.

use super::{parse_enum, parse_optional_uuid, parse_uuid, RepoError, RepoResult};
use crate::model::audit::AuditEntry;
use crate::model::staff::Role;
use rusqlite::{params, Connection, Row};

pub trait AuditRepository {
    fn append(&self, entry: &AuditEntry) -> RepoResult<()>;
    /// Newest first, at most `limit` rows.
    fn list_recent(&self, limit: u32) -> RepoResult<Vec<AuditEntry>>;
}

pub struct SqliteAuditRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuditRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AuditRepository for SqliteAuditRepository<'_> {
    fn append(&self, entry: &AuditEntry) -> RepoResult<()> {
        let details = entry
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| RepoError::InvalidData(format!("audit details: {err}")))?;

        self.conn.execute(
            "INSERT INTO audit_log (
                id,
                user_id,
                user_role,
                action,
                entity_type,
                entity_id,
                details
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                entry.id.to_string(),
                entry.user_id.to_string(),
                entry.user_role.as_str(),
                entry.action.as_str(),
                entry.entity_type.as_str(),
                entry.entity_id.map(|id| id.to_string()),
                details,
            ],
        )?;
        Ok(())
    }

    fn list_recent(&self, limit: u32) -> RepoResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                user_id,
                user_role,
                action,
                entity_type,
                entity_id,
                details,
                created_at
             FROM audit_log
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1;",
        )?;
        let mut rows = stmt.query([i64::from(limit)])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_audit_row(row)?);
        }
        Ok(entries)
    }
}

fn parse_audit_row(row: &Row<'_>) -> RepoResult<AuditEntry> {
    let id: String = row.get("id")?;
    let user_id: String = row.get("user_id")?;
    let user_role: String = row.get("user_role")?;
    let entity_id: Option<String> = row.get("entity_id")?;
    let details: Option<String> = row.get("details")?;

    let details = details
        .map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(|err| RepoError::InvalidData(format!("audit_log.details for {id}: {err}")))?;

    Ok(AuditEntry {
        id: parse_uuid(&id, "audit_log.id")?,
        user_id: parse_uuid(&user_id, "audit_log.user_id")?,
        user_role: parse_enum(&user_role, "audit_log.user_role", Role::parse)?,
        action: row.get("action")?,
        entity_type: row.get("entity_type")?,
        entity_id: parse_optional_uuid(entity_id, "audit_log.entity_id")?,
        details,
        created_at: row.get("created_at")?,
    })
}
