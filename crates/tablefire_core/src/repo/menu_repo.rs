//! Menu item repository.
//!
//! # Invariants
//! - Menu item names are unique; upserts key on `name`.
//! - Listing order is `category ASC, name ASC`.

use super::{bool_to_int, parse_flag, parse_uuid, RepoError, RepoResult};
use crate::model::menu::{MenuItem, MenuItemId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const MENU_SELECT_SQL: &str = "SELECT
    id,
    name,
    category,
    price_minor,
    description,
    is_available,
    created_at,
    updated_at
FROM menu_items";

/// Query options for menu listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuQuery {
    pub category: Option<String>,
    pub available_only: bool,
}

pub trait MenuRepository {
    /// Inserts or updates by name. Returns the persisted id, which is the
    /// existing id when the name was already present.
    fn upsert_menu_item(&self, item: &MenuItem) -> RepoResult<MenuItemId>;
    fn get_menu_item(&self, id: MenuItemId) -> RepoResult<Option<MenuItem>>;
    fn find_by_name(&self, name: &str) -> RepoResult<Option<MenuItem>>;
    fn list_menu(&self, query: &MenuQuery) -> RepoResult<Vec<MenuItem>>;
    /// Distinct categories, sorted.
    fn list_categories(&self) -> RepoResult<Vec<String>>;
    fn set_availability(&self, id: MenuItemId, is_available: bool) -> RepoResult<()>;
}

pub struct SqliteMenuRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMenuRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MenuRepository for SqliteMenuRepository<'_> {
    fn upsert_menu_item(&self, item: &MenuItem) -> RepoResult<MenuItemId> {
        item.validate()?;

        self.conn.execute(
            "INSERT INTO menu_items (
                id,
                name,
                category,
                price_minor,
                description,
                is_available
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(name) DO UPDATE SET
                category = excluded.category,
                price_minor = excluded.price_minor,
                description = excluded.description,
                is_available = excluded.is_available,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                item.id.to_string(),
                item.name.as_str(),
                item.category.as_str(),
                item.price_minor,
                item.description.as_deref(),
                bool_to_int(item.is_available),
            ],
        )?;

        let id: String = self.conn.query_row(
            "SELECT id FROM menu_items WHERE name = ?1;",
            [item.name.as_str()],
            |row| row.get(0),
        )?;
        parse_uuid(&id, "menu_items.id")
    }

    fn get_menu_item(&self, id: MenuItemId) -> RepoResult<Option<MenuItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MENU_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_menu_row(row)?));
        }
        Ok(None)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<MenuItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MENU_SELECT_SQL} WHERE name = ?1;"))?;
        let mut rows = stmt.query([name.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_menu_row(row)?));
        }
        Ok(None)
    }

    fn list_menu(&self, query: &MenuQuery) -> RepoResult<Vec<MenuItem>> {
        let mut sql = format!("{MENU_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if query.available_only {
            sql.push_str(" AND is_available = 1");
        }
        if let Some(category) = query.category.as_ref() {
            sql.push_str(" AND category = ?");
            bind_values.push(Value::Text(category.trim().to_string()));
        }
        sql.push_str(" ORDER BY category ASC, name ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_menu_row(row)?);
        }
        Ok(items)
    }

    fn list_categories(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT category FROM menu_items ORDER BY category ASC;")?;
        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(row.get(0)?);
        }
        Ok(categories)
    }

    fn set_availability(&self, id: MenuItemId, is_available: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE menu_items
             SET
                is_available = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), bool_to_int(is_available)],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("menu item", id));
        }
        Ok(())
    }
}

pub(crate) fn parse_menu_row(row: &Row<'_>) -> RepoResult<MenuItem> {
    let id: String = row.get("id")?;
    let is_available: i64 = row.get("is_available")?;

    let item = MenuItem {
        id: parse_uuid(&id, "menu_items.id")?,
        name: row.get("name")?,
        category: row.get("category")?,
        price_minor: row.get("price_minor")?,
        description: row.get("description")?,
        is_available: parse_flag(is_available, "menu_items.is_available")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    item.validate()
        .map_err(|err| RepoError::InvalidData(format!("menu_items row {id}: {err}")))?;
    Ok(item)
}
