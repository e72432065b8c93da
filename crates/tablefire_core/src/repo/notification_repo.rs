//! Notification repository.
//!
//! # Invariants
//! - Visibility: `recipient_id = me OR (recipient_id IS NULL AND recipient_role = my role)`.
//! - Mark-read only touches rows visible to the caller.

use super::{bool_to_int, parse_enum, parse_flag, parse_optional_uuid, parse_uuid, RepoResult};
use crate::model::notification::{Notification, NotificationId};
use crate::model::staff::{Role, StaffMember};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const NOTIFICATION_SELECT_SQL: &str = "SELECT
    id,
    recipient_role,
    recipient_id,
    kind,
    title,
    message,
    reference_id,
    is_read,
    created_at
FROM notifications";

const VISIBLE_TO_SQL: &str =
    "(recipient_id = ?1 OR (recipient_id IS NULL AND recipient_role = ?2))";

pub trait NotificationRepository {
    fn create_notification(&self, notification: &Notification) -> RepoResult<NotificationId>;
    fn get_notification(&self, id: NotificationId) -> RepoResult<Option<Notification>>;
    /// Newest first, at most `limit` rows.
    fn list_for(&self, member: &StaffMember, limit: u32) -> RepoResult<Vec<Notification>>;
    fn unread_count(&self, member: &StaffMember) -> RepoResult<u64>;
    /// Marks visible rows read. Returns how many rows changed.
    fn mark_read(&self, member: &StaffMember, ids: &[NotificationId]) -> RepoResult<usize>;
}

pub struct SqliteNotificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NotificationRepository for SqliteNotificationRepository<'_> {
    fn create_notification(&self, notification: &Notification) -> RepoResult<NotificationId> {
        notification.validate()?;

        self.conn.execute(
            "INSERT INTO notifications (
                id,
                recipient_role,
                recipient_id,
                kind,
                title,
                message,
                reference_id,
                is_read
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                notification.id.to_string(),
                notification.recipient_role.as_str(),
                notification.recipient_id.map(|id| id.to_string()),
                notification.kind.as_str(),
                notification.title.as_str(),
                notification.message.as_str(),
                notification.reference_id.map(|id| id.to_string()),
                bool_to_int(notification.is_read),
            ],
        )?;
        Ok(notification.id)
    }

    fn get_notification(&self, id: NotificationId) -> RepoResult<Option<Notification>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTIFICATION_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_notification_row(row)?));
        }
        Ok(None)
    }

    fn list_for(&self, member: &StaffMember, limit: u32) -> RepoResult<Vec<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTIFICATION_SELECT_SQL}
             WHERE {VISIBLE_TO_SQL}
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?3;"
        ))?;
        let mut rows = stmt.query(params![
            member.id.to_string(),
            member.role.as_str(),
            i64::from(limit)
        ])?;
        let mut notifications = Vec::new();
        while let Some(row) = rows.next()? {
            notifications.push(parse_notification_row(row)?);
        }
        Ok(notifications)
    }

    fn unread_count(&self, member: &StaffMember) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM notifications WHERE {VISIBLE_TO_SQL} AND is_read = 0;"),
            params![member.id.to_string(), member.role.as_str()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn mark_read(&self, member: &StaffMember, ids: &[NotificationId]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE notifications
             SET is_read = 1
             WHERE {VISIBLE_TO_SQL}
               AND is_read = 0
               AND id IN ({placeholders});"
        );
        let mut bind_values = vec![
            Value::Text(member.id.to_string()),
            Value::Text(member.role.as_str().to_string()),
        ];
        bind_values.extend(ids.iter().map(|id| Value::Text(id.to_string())));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(changed)
    }
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<Notification> {
    let id: String = row.get("id")?;
    let recipient_role: String = row.get("recipient_role")?;
    let recipient_id: Option<String> = row.get("recipient_id")?;
    let reference_id: Option<String> = row.get("reference_id")?;
    let is_read: i64 = row.get("is_read")?;

    Ok(Notification {
        id: parse_uuid(&id, "notifications.id")?,
        recipient_role: parse_enum(&recipient_role, "notifications.recipient_role", Role::parse)?,
        recipient_id: parse_optional_uuid(recipient_id, "notifications.recipient_id")?,
        kind: row.get("kind")?,
        title: row.get("title")?,
        message: row.get("message")?,
        reference_id: parse_optional_uuid(reference_id, "notifications.reference_id")?,
        is_read: parse_flag(is_read, "notifications.is_read")?,
        created_at: row.get("created_at")?,
    })
}
