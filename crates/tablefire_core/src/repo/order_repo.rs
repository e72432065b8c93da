//! Order and order item repository, plus the joined order read model.
//!
//! # Invariants
//! - At most one non-billed order exists per table (enforced by a partial
//!   unique index; violations surface as `Conflict`).
//! - Item rows always reference an existing order and menu item.
//! - Orders and items list oldest first, insertion order breaking ties.

use super::staff_repo::{SqliteStaffRepository, StaffRepository};
use super::table_repo::{SqliteTableRepository, TableRepository};
use super::{map_constraint, parse_enum, parse_flag, parse_uuid, RepoError, RepoResult};
use crate::model::menu::MenuItem;
use crate::model::order::{
    Order, OrderDetails, OrderId, OrderItem, OrderItemId, OrderItemStatus, OrderLine, OrderStatus,
};
use crate::model::staff::StaffId;
use crate::model::table::TableId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const ORDER_SELECT_SQL: &str = "SELECT
    id,
    table_id,
    server_id,
    status,
    created_at,
    updated_at
FROM orders";

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    order_id,
    menu_item_id,
    quantity,
    notes,
    status,
    created_at,
    updated_at
FROM order_items";

const LINE_SELECT_SQL: &str = "SELECT
    oi.id AS item_id,
    oi.order_id AS item_order_id,
    oi.menu_item_id AS item_menu_item_id,
    oi.quantity AS item_quantity,
    oi.notes AS item_notes,
    oi.status AS item_status,
    oi.created_at AS item_created_at,
    oi.updated_at AS item_updated_at,
    m.name AS menu_name,
    m.category AS menu_category,
    m.price_minor AS menu_price_minor,
    m.description AS menu_description,
    m.is_available AS menu_is_available,
    m.created_at AS menu_created_at,
    m.updated_at AS menu_updated_at
FROM order_items oi
INNER JOIN menu_items m ON m.id = oi.menu_item_id";

/// Filter for joined order listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDetailsQuery {
    /// Empty means every status.
    pub statuses: Vec<OrderStatus>,
    pub server_id: Option<StaffId>,
    pub table_id: Option<TableId>,
    /// Drop orders that have no items yet.
    pub require_items: bool,
}

pub trait OrderRepository {
    fn create_order(&self, order: &Order) -> RepoResult<OrderId>;
    fn get_order(&self, id: OrderId) -> RepoResult<Option<Order>>;
    /// Returns the table's order that is not yet billed, if any.
    fn find_open_order_for_table(&self, table_id: TableId) -> RepoResult<Option<Order>>;
    fn update_order_status(&self, id: OrderId, status: OrderStatus) -> RepoResult<()>;
    fn create_item(&self, item: &OrderItem) -> RepoResult<OrderItemId>;
    fn get_item(&self, id: OrderItemId) -> RepoResult<Option<OrderItem>>;
    fn list_items(&self, order_id: OrderId) -> RepoResult<Vec<OrderItem>>;
    fn update_item_status(&self, id: OrderItemId, status: OrderItemStatus) -> RepoResult<()>;
    fn get_order_details(&self, id: OrderId) -> RepoResult<Option<OrderDetails>>;
    fn list_order_details(&self, query: &OrderDetailsQuery) -> RepoResult<Vec<OrderDetails>>;
}

pub struct SqliteOrderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrderRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn list_orders(&self, query: &OrderDetailsQuery) -> RepoResult<Vec<Order>> {
        let mut sql = format!("{ORDER_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.statuses.is_empty() {
            let placeholders = vec!["?"; query.statuses.len()].join(", ");
            sql.push_str(&format!(" AND status IN ({placeholders})"));
            for status in &query.statuses {
                bind_values.push(Value::Text(status.as_str().to_string()));
            }
        }
        if let Some(server_id) = query.server_id {
            sql.push_str(" AND server_id = ?");
            bind_values.push(Value::Text(server_id.to_string()));
        }
        if let Some(table_id) = query.table_id {
            sql.push_str(" AND table_id = ?");
            bind_values.push(Value::Text(table_id.to_string()));
        }
        sql.push_str(" ORDER BY created_at ASC, rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut orders = Vec::new();
        while let Some(row) = rows.next()? {
            orders.push(parse_order_row(row)?);
        }
        Ok(orders)
    }

    fn load_lines(&self, order_id: OrderId) -> RepoResult<Vec<OrderLine>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LINE_SELECT_SQL}
             WHERE oi.order_id = ?1
             ORDER BY oi.created_at ASC, oi.rowid ASC;"
        ))?;
        let mut rows = stmt.query([order_id.to_string()])?;
        let mut lines = Vec::new();
        while let Some(row) = rows.next()? {
            lines.push(parse_line_row(row)?);
        }
        Ok(lines)
    }

    fn join_details(&self, order: Order) -> RepoResult<OrderDetails> {
        let table = SqliteTableRepository::new(self.conn)
            .get_table(order.table_id)?
            .ok_or_else(|| RepoError::not_found("table", order.table_id))?;
        let server = SqliteStaffRepository::new(self.conn)
            .get_staff(order.server_id)?
            .ok_or_else(|| RepoError::not_found("staff", order.server_id))?;
        let lines = self.load_lines(order.id)?;

        Ok(OrderDetails {
            order,
            table,
            server,
            lines,
        })
    }
}

impl OrderRepository for SqliteOrderRepository<'_> {
    fn create_order(&self, order: &Order) -> RepoResult<OrderId> {
        self.conn
            .execute(
                "INSERT INTO orders (id, table_id, server_id, status) VALUES (?1, ?2, ?3, ?4);",
                params![
                    order.id.to_string(),
                    order.table_id.to_string(),
                    order.server_id.to_string(),
                    order.status.as_str(),
                ],
            )
            .map_err(|err| {
                map_constraint(err, format!("table {} already has an open order", order.table_id))
            })?;
        Ok(order.id)
    }

    fn get_order(&self, id: OrderId) -> RepoResult<Option<Order>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ORDER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_order_row(row)?));
        }
        Ok(None)
    }

    fn find_open_order_for_table(&self, table_id: TableId) -> RepoResult<Option<Order>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ORDER_SELECT_SQL} WHERE table_id = ?1 AND status <> 'billed';"
        ))?;
        let mut rows = stmt.query([table_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_order_row(row)?));
        }
        Ok(None)
    }

    fn update_order_status(&self, id: OrderId, status: OrderStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE orders
             SET
                status = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), status.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("order", id));
        }
        Ok(())
    }

    fn create_item(&self, item: &OrderItem) -> RepoResult<OrderItemId> {
        item.validate()?;

        self.conn
            .execute(
                "INSERT INTO order_items (
                    id,
                    order_id,
                    menu_item_id,
                    quantity,
                    notes,
                    status
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    item.id.to_string(),
                    item.order_id.to_string(),
                    item.menu_item_id.to_string(),
                    item.quantity,
                    item.notes.as_deref(),
                    item.status.as_str(),
                ],
            )
            .map_err(|err| map_constraint(err, format!("order item {}", item.id)))?;
        Ok(item.id)
    }

    fn get_item(&self, id: OrderItemId) -> RepoResult<Option<OrderItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn list_items(&self, order_id: OrderId) -> RepoResult<Vec<OrderItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL} WHERE order_id = ?1 ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([order_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn update_item_status(&self, id: OrderItemId, status: OrderItemStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE order_items
             SET
                status = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), status.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("order item", id));
        }
        Ok(())
    }

    fn get_order_details(&self, id: OrderId) -> RepoResult<Option<OrderDetails>> {
        match self.get_order(id)? {
            Some(order) => Ok(Some(self.join_details(order)?)),
            None => Ok(None),
        }
    }

    fn list_order_details(&self, query: &OrderDetailsQuery) -> RepoResult<Vec<OrderDetails>> {
        let mut details = Vec::new();
        for order in self.list_orders(query)? {
            let joined = self.join_details(order)?;
            if query.require_items && joined.lines.is_empty() {
                continue;
            }
            details.push(joined);
        }
        Ok(details)
    }
}

pub(crate) fn parse_order_row(row: &Row<'_>) -> RepoResult<Order> {
    let id: String = row.get("id")?;
    let table_id: String = row.get("table_id")?;
    let server_id: String = row.get("server_id")?;
    let status: String = row.get("status")?;

    Ok(Order {
        id: parse_uuid(&id, "orders.id")?,
        table_id: parse_uuid(&table_id, "orders.table_id")?,
        server_id: parse_uuid(&server_id, "orders.server_id")?,
        status: parse_enum(&status, "orders.status", OrderStatus::parse)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn parse_item_row(row: &Row<'_>) -> RepoResult<OrderItem> {
    let id: String = row.get("id")?;
    let order_id: String = row.get("order_id")?;
    let menu_item_id: String = row.get("menu_item_id")?;
    let status: String = row.get("status")?;

    let item = OrderItem {
        id: parse_uuid(&id, "order_items.id")?,
        order_id: parse_uuid(&order_id, "order_items.order_id")?,
        menu_item_id: parse_uuid(&menu_item_id, "order_items.menu_item_id")?,
        quantity: row.get("quantity")?,
        notes: row.get("notes")?,
        status: parse_enum(&status, "order_items.status", OrderItemStatus::parse)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    item.validate()
        .map_err(|err| RepoError::InvalidData(format!("order_items row {id}: {err}")))?;
    Ok(item)
}

fn parse_line_row(row: &Row<'_>) -> RepoResult<OrderLine> {
    let id: String = row.get("item_id")?;
    let order_id: String = row.get("item_order_id")?;
    let menu_item_id: String = row.get("item_menu_item_id")?;
    let status: String = row.get("item_status")?;
    let is_available: i64 = row.get("menu_is_available")?;
    let menu_item_id = parse_uuid(&menu_item_id, "order_items.menu_item_id")?;

    let item = OrderItem {
        id: parse_uuid(&id, "order_items.id")?,
        order_id: parse_uuid(&order_id, "order_items.order_id")?,
        menu_item_id,
        quantity: row.get("item_quantity")?,
        notes: row.get("item_notes")?,
        status: parse_enum(&status, "order_items.status", OrderItemStatus::parse)?,
        created_at: row.get("item_created_at")?,
        updated_at: row.get("item_updated_at")?,
    };
    let menu_item = MenuItem {
        id: menu_item_id,
        name: row.get("menu_name")?,
        category: row.get("menu_category")?,
        price_minor: row.get("menu_price_minor")?,
        description: row.get("menu_description")?,
        is_available: parse_flag(is_available, "menu_items.is_available")?,
        created_at: row.get("menu_created_at")?,
        updated_at: row.get("menu_updated_at")?,
    };

    Ok(OrderLine { item, menu_item })
}

