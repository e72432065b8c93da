//! Session token repository.

use super::{parse_uuid, RepoResult};
use crate::model::staff::StaffId;
use rusqlite::{params, Connection, OptionalExtension};

/// Stored session row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token: String,
    pub staff_id: StaffId,
    pub expires_at: i64,
}

pub trait SessionRepository {
    fn create_session(&self, record: &SessionRecord) -> RepoResult<()>;
    fn find_session(&self, token: &str) -> RepoResult<Option<SessionRecord>>;
    /// Deletes one session. Returns whether a row existed.
    fn delete_session(&self, token: &str) -> RepoResult<bool>;
    /// Deletes every session expired at `now_ms`. Returns the number removed.
    fn purge_expired(&self, now_ms: i64) -> RepoResult<usize>;
}

pub struct SqliteSessionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSessionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SessionRepository for SqliteSessionRepository<'_> {
    fn create_session(&self, record: &SessionRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO sessions (token, staff_id, expires_at) VALUES (?1, ?2, ?3);",
            params![
                record.token.as_str(),
                record.staff_id.to_string(),
                record.expires_at
            ],
        )?;
        Ok(())
    }

    fn find_session(&self, token: &str) -> RepoResult<Option<SessionRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT token, staff_id, expires_at FROM sessions WHERE token = ?1;",
                [token],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((token, staff_id, expires_at)) => Ok(Some(SessionRecord {
                token,
                staff_id: parse_uuid(&staff_id, "sessions.staff_id")?,
                expires_at,
            })),
            None => Ok(None),
        }
    }

    fn delete_session(&self, token: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM sessions WHERE token = ?1;", [token])?;
        Ok(changed > 0)
    }

    fn purge_expired(&self, now_ms: i64) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM sessions WHERE expires_at <= ?1;", [now_ms])?;
        Ok(changed)
    }
}
