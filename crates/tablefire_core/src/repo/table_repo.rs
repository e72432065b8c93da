//! Dining table repository.
//!
//! # Invariants
//! - `table_number` is unique; inserts of an existing number are no-ops.
//! - Status writes validate the free/server pairing before SQL.

use super::{parse_enum, parse_optional_uuid, parse_uuid, RepoError, RepoResult};
use crate::model::staff::StaffId;
use crate::model::table::{check_server_assignment, DiningTable, TableId, TableStatus};
use rusqlite::{params, Connection, Row};

const TABLE_SELECT_SQL: &str = "SELECT
    id,
    table_number,
    status,
    current_server_id,
    created_at,
    updated_at
FROM dining_tables";

pub trait TableRepository {
    /// Inserts a table unless its number already exists.
    ///
    /// Returns `true` when a row was inserted.
    fn create_table_if_missing(&self, table: &DiningTable) -> RepoResult<bool>;
    fn get_table(&self, id: TableId) -> RepoResult<Option<DiningTable>>;
    fn get_by_number(&self, table_number: i64) -> RepoResult<Option<DiningTable>>;
    /// Lists tables ordered by number.
    fn list_tables(&self) -> RepoResult<Vec<DiningTable>>;
    fn list_by_status(&self, status: TableStatus) -> RepoResult<Vec<DiningTable>>;
    fn update_status(
        &self,
        id: TableId,
        status: TableStatus,
        current_server_id: Option<StaffId>,
    ) -> RepoResult<()>;
}

pub struct SqliteTableRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTableRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_tables(&self, sql: &str, bind: &[&dyn rusqlite::ToSql]) -> RepoResult<Vec<DiningTable>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(bind)?;
        let mut tables = Vec::new();
        while let Some(row) = rows.next()? {
            tables.push(parse_table_row(row)?);
        }
        Ok(tables)
    }
}

impl TableRepository for SqliteTableRepository<'_> {
    fn create_table_if_missing(&self, table: &DiningTable) -> RepoResult<bool> {
        table.validate()?;

        let changed = self.conn.execute(
            "INSERT INTO dining_tables (id, table_number, status, current_server_id)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(table_number) DO NOTHING;",
            params![
                table.id.to_string(),
                table.table_number,
                table.status.as_str(),
                table.current_server_id.map(|id| id.to_string()),
            ],
        )?;
        Ok(changed > 0)
    }

    fn get_table(&self, id: TableId) -> RepoResult<Option<DiningTable>> {
        let id_text = id.to_string();
        let mut tables = self.query_tables(
            &format!("{TABLE_SELECT_SQL} WHERE id = ?1;"),
            &[&id_text],
        )?;
        Ok(tables.pop())
    }

    fn get_by_number(&self, table_number: i64) -> RepoResult<Option<DiningTable>> {
        let mut tables = self.query_tables(
            &format!("{TABLE_SELECT_SQL} WHERE table_number = ?1;"),
            &[&table_number],
        )?;
        Ok(tables.pop())
    }

    fn list_tables(&self) -> RepoResult<Vec<DiningTable>> {
        self.query_tables(&format!("{TABLE_SELECT_SQL} ORDER BY table_number ASC;"), &[])
    }

    fn list_by_status(&self, status: TableStatus) -> RepoResult<Vec<DiningTable>> {
        self.query_tables(
            &format!("{TABLE_SELECT_SQL} WHERE status = ?1 ORDER BY table_number ASC;"),
            &[&status.as_str()],
        )
    }

    fn update_status(
        &self,
        id: TableId,
        status: TableStatus,
        current_server_id: Option<StaffId>,
    ) -> RepoResult<()> {
        check_server_assignment(status, current_server_id)?;

        let changed = self.conn.execute(
            "UPDATE dining_tables
             SET
                status = ?2,
                current_server_id = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id.to_string(),
                status.as_str(),
                current_server_id.map(|id| id.to_string()),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("table", id));
        }
        Ok(())
    }
}

pub(crate) fn parse_table_row(row: &Row<'_>) -> RepoResult<DiningTable> {
    let id: String = row.get("id")?;
    let status: String = row.get("status")?;
    let current_server_id: Option<String> = row.get("current_server_id")?;

    let table = DiningTable {
        id: parse_uuid(&id, "dining_tables.id")?,
        table_number: row.get("table_number")?,
        status: parse_enum(&status, "dining_tables.status", TableStatus::parse)?,
        current_server_id: parse_optional_uuid(
            current_server_id,
            "dining_tables.current_server_id",
        )?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    table
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("dining_tables row {id}: {err}")))?;
    Ok(table)
}
