//! Durable change journal backed by the `change_log` table.

use super::{ChangeEvent, ChangeKind};
use crate::db::now_epoch_ms;
use crate::repo::{parse_enum, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use serde_json::Value;

/// Collects the change rows written during one unit of work.
///
/// Bind it to the same transaction as the data writes; hand
/// [`Journal::into_events`] to the feed only after commit.
pub struct Journal<'conn> {
    conn: &'conn Connection,
    events: Vec<ChangeEvent>,
}

impl<'conn> Journal<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            events: Vec::new(),
        }
    }

    pub fn inserted<T: Serialize>(
        &mut self,
        table: &str,
        row_id: impl ToString,
        new: &T,
    ) -> RepoResult<()> {
        let new = to_row_image(new)?;
        self.record(table, ChangeKind::Insert, row_id.to_string(), Some(new), None)
    }

    pub fn updated<T: Serialize>(
        &mut self,
        table: &str,
        row_id: impl ToString,
        old: &T,
        new: &T,
    ) -> RepoResult<()> {
        let old = to_row_image(old)?;
        let new = to_row_image(new)?;
        self.record(
            table,
            ChangeKind::Update,
            row_id.to_string(),
            Some(new),
            Some(old),
        )
    }

    pub fn deleted<T: Serialize>(
        &mut self,
        table: &str,
        row_id: impl ToString,
        old: &T,
    ) -> RepoResult<()> {
        let old = to_row_image(old)?;
        self.record(table, ChangeKind::Delete, row_id.to_string(), None, Some(old))
    }

    /// Events recorded so far, in `seq` order.
    pub fn into_events(self) -> Vec<ChangeEvent> {
        self.events
    }

    fn record(
        &mut self,
        table: &str,
        kind: ChangeKind,
        row_id: String,
        new: Option<Value>,
        old: Option<Value>,
    ) -> RepoResult<()> {
        let created_at = now_epoch_ms();
        self.conn.execute(
            "INSERT INTO change_log (table_name, kind, row_id, new_row, old_row, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                table,
                kind.as_str(),
                row_id.as_str(),
                new.as_ref().map(Value::to_string),
                old.as_ref().map(Value::to_string),
                created_at,
            ],
        )?;

        self.events.push(ChangeEvent {
            seq: self.conn.last_insert_rowid(),
            table: table.to_string(),
            kind,
            row_id,
            new,
            old,
            created_at,
        });
        Ok(())
    }
}

/// Reads up to `limit` events with `seq > after_seq`, oldest first.
pub fn read_after(conn: &Connection, after_seq: i64, limit: u32) -> RepoResult<Vec<ChangeEvent>> {
    let mut stmt = conn.prepare(
        "SELECT seq, table_name, kind, row_id, new_row, old_row, created_at
         FROM change_log
         WHERE seq > ?1
         ORDER BY seq ASC
         LIMIT ?2;",
    )?;
    let mut rows = stmt.query(params![after_seq, i64::from(limit)])?;
    let mut events = Vec::new();
    while let Some(row) = rows.next()? {
        events.push(parse_change_row(row)?);
    }
    Ok(events)
}

/// Highest committed `seq`, or 0 for an empty journal.
pub fn latest_seq(conn: &Connection) -> RepoResult<i64> {
    let seq: Option<i64> = conn.query_row("SELECT MAX(seq) FROM change_log;", [], |row| {
        row.get(0)
    })?;
    Ok(seq.unwrap_or(0))
}

fn to_row_image<T: Serialize>(row: &T) -> RepoResult<Value> {
    serde_json::to_value(row)
        .map_err(|err| RepoError::InvalidData(format!("unserializable row image: {err}")))
}

fn parse_json_column(value: Option<String>, column: &str) -> RepoResult<Option<Value>> {
    value
        .map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(|err| RepoError::InvalidData(format!("invalid json in {column}: {err}")))
}

fn parse_change_row(row: &Row<'_>) -> RepoResult<ChangeEvent> {
    let kind: String = row.get("kind")?;
    let new_row: Option<String> = row.get("new_row")?;
    let old_row: Option<String> = row.get("old_row")?;

    Ok(ChangeEvent {
        seq: row.get("seq")?,
        table: row.get("table_name")?,
        kind: parse_enum(&kind, "change_log.kind", ChangeKind::parse)?,
        row_id: row.get("row_id")?,
        new: parse_json_column(new_row, "change_log.new_row")?,
        old: parse_json_column(old_row, "change_log.old_row")?,
        created_at: row.get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{latest_seq, read_after, Journal};
    use crate::db::open_db_in_memory;
    use crate::realtime::ChangeKind;
    use serde_json::json;

    #[test]
    fn recorded_events_are_readable_in_seq_order() {
        let conn = open_db_in_memory().expect("open db");
        assert_eq!(latest_seq(&conn).expect("empty seq"), 0);

        let mut journal = Journal::new(&conn);
        journal
            .inserted("orders", "o-1", &json!({"id": "o-1", "status": "pending"}))
            .expect("insert event");
        journal
            .updated(
                "orders",
                "o-1",
                &json!({"id": "o-1", "status": "pending"}),
                &json!({"id": "o-1", "status": "in_progress"}),
            )
            .expect("update event");
        let recorded = journal.into_events();

        let stored = read_after(&conn, 0, 10).expect("read journal");
        assert_eq!(stored, recorded);
        assert_eq!(stored[1].kind, ChangeKind::Update);
        assert_eq!(stored[1].old.as_ref().map(|row| &row["status"]), Some(&json!("pending")));
        assert_eq!(latest_seq(&conn).expect("seq"), stored[1].seq);

        let tail = read_after(&conn, stored[0].seq, 10).expect("read tail");
        assert_eq!(tail.len(), 1);
    }
}
