//! Floor workflow for servers: seating, ordering and serving.
//!
//! # Invariants
//! - A table has at most one open order; new lines join it.
//! - Only `prepared` items can be served.
//! - A table turns `served` exactly when its open order derives to `served`.

use super::notification_service::{notify_order_created, notify_table_served};
use super::{require_table, set_table_status, sync_order_status, write_unit};
use super::{ServiceError, ServiceResult};
use crate::auth::guard::Permission;
use crate::auth::session::Session;
use crate::model::audit::AuditEntry;
use crate::model::menu::MenuItem;
use crate::model::order::{
    NewOrderLine, Order, OrderDetails, OrderItem, OrderItemId, OrderItemStatus, OrderStatus,
};
use crate::model::table::{DiningTable, TableStatus};
use crate::realtime::{tables, ChangeFeed};
use crate::repo::audit_repo::{AuditRepository, SqliteAuditRepository};
use crate::repo::menu_repo::{MenuQuery, MenuRepository, SqliteMenuRepository};
use crate::repo::order_repo::{OrderDetailsQuery, OrderRepository, SqliteOrderRepository};
use crate::repo::table_repo::{SqliteTableRepository, TableRepository};
use log::info;
use rusqlite::Connection;
use serde_json::json;

/// Orders that have not been billed yet.
pub(crate) const OPEN_ORDER_STATUSES: [OrderStatus; 4] = [
    OrderStatus::Pending,
    OrderStatus::InProgress,
    OrderStatus::Prepared,
    OrderStatus::Served,
];

pub struct ServerService<'a> {
    conn: &'a Connection,
    feed: &'a ChangeFeed,
    session: &'a Session,
}

impl<'a> ServerService<'a> {
    pub fn new(conn: &'a Connection, feed: &'a ChangeFeed, session: &'a Session) -> Self {
        Self {
            conn,
            feed,
            session,
        }
    }

    /// Floor plan, ordered by table number.
    pub fn list_tables(&self) -> ServiceResult<Vec<DiningTable>> {
        Ok(SqliteTableRepository::new(self.conn).list_tables()?)
    }

    /// Orderable menu, optionally narrowed to one category.
    pub fn list_menu(&self, category: Option<&str>) -> ServiceResult<Vec<MenuItem>> {
        let query = MenuQuery {
            category: category.map(str::to_string),
            available_only: true,
        };
        Ok(SqliteMenuRepository::new(self.conn).list_menu(&query)?)
    }

    pub fn menu_categories(&self) -> ServiceResult<Vec<String>> {
        Ok(SqliteMenuRepository::new(self.conn).list_categories()?)
    }

    /// Seats guests at a free table and assigns it to the caller.
    pub fn seat_table(&self, table_number: i64) -> ServiceResult<DiningTable> {
        self.session.require(Permission::SeatTable)?;
        let me = &self.session.staff;

        let table = write_unit(self.conn, self.feed, |conn, journal| {
            let table = require_table(conn, table_number)?;
            if !table.can_seat() {
                return Err(ServiceError::invalid_transition(
                    "table",
                    table.status.as_str(),
                    TableStatus::Occupied.as_str(),
                ));
            }
            let seated = set_table_status(conn, journal, &table, TableStatus::Occupied, Some(me.id))?;
            let entry = AuditEntry::by(me, "table_seated", "table", Some(table.id))
                .with_details(json!({ "table_number": table_number }));
            SqliteAuditRepository::new(conn).append(&entry)?;
            Ok(seated)
        })?;

        info!("event=table_seat module=service status=ok table_number={table_number}");
        Ok(table)
    }

    /// Adds `lines` to the table's open order, opening one if needed.
    pub fn submit_order(
        &self,
        table_number: i64,
        lines: &[NewOrderLine],
    ) -> ServiceResult<OrderDetails> {
        self.session.require(Permission::PlaceOrder)?;
        if lines.is_empty() {
            return Err(ServiceError::EmptyOrder);
        }
        let me = &self.session.staff;

        let (details, is_new_order) = write_unit(self.conn, self.feed, |conn, journal| {
            let table = require_table(conn, table_number)?;
            let menu_repo = SqliteMenuRepository::new(conn);
            let order_repo = SqliteOrderRepository::new(conn);

            let mut menu_items = Vec::with_capacity(lines.len());
            for line in lines {
                let menu_item = menu_repo
                    .get_menu_item(line.menu_item_id)?
                    .ok_or_else(|| ServiceError::not_found("menu item", line.menu_item_id))?;
                if !menu_item.is_available {
                    return Err(ServiceError::MenuItemUnavailable(menu_item.name));
                }
                menu_items.push(menu_item);
            }

            let (order, is_new_order) = match order_repo.find_open_order_for_table(table.id)? {
                Some(order) => (order, false),
                None => {
                    let order = Order::open(table.id, me.id);
                    order_repo.create_order(&order)?;
                    let stored = order_repo
                        .get_order(order.id)?
                        .ok_or_else(|| ServiceError::not_found("order", order.id))?;
                    journal.inserted(tables::ORDERS, stored.id, &stored)?;
                    (stored, true)
                }
            };

            for line in lines {
                let item = OrderItem::new(order.id, line.menu_item_id, line.quantity, line.notes.clone());
                order_repo.create_item(&item)?;
                let stored = order_repo
                    .get_item(item.id)?
                    .ok_or_else(|| ServiceError::not_found("order item", item.id))?;
                journal.inserted(tables::ORDER_ITEMS, stored.id, &stored)?;
            }
            sync_order_status(conn, journal, order.id)?;

            if table.status != TableStatus::Active || table.current_server_id != Some(me.id) {
                set_table_status(conn, journal, &table, TableStatus::Active, Some(me.id))?;
            }

            let entry = AuditEntry::by(me, "order_items_added", "order", Some(order.id))
                .with_details(json!({
                    "items_count": lines.len(),
                    "table_number": table_number,
                    "new_order": is_new_order,
                    "menu_items": menu_items.iter().map(|item| item.name.as_str()).collect::<Vec<_>>(),
                }));
            SqliteAuditRepository::new(conn).append(&entry)?;

            if is_new_order {
                notify_order_created(conn, journal, table_number, order.id, &me.full_name)?;
            }

            let details = order_repo
                .get_order_details(order.id)?
                .ok_or_else(|| ServiceError::not_found("order", order.id))?;
            Ok((details, is_new_order))
        })?;

        info!(
            "event=order_submit module=service status=ok table_number={} items={} new_order={}",
            table_number,
            lines.len(),
            is_new_order
        );
        Ok(details)
    }

    /// Marks a prepared item served.
    pub fn serve_item(&self, item_id: OrderItemId) -> ServiceResult<OrderDetails> {
        self.session.require(Permission::ServeItem)?;
        let me = &self.session.staff;

        let details = write_unit(self.conn, self.feed, |conn, journal| {
            let order_repo = SqliteOrderRepository::new(conn);
            let item = order_repo
                .get_item(item_id)?
                .ok_or_else(|| ServiceError::not_found("order item", item_id))?;
            if item.status.next() != Some(OrderItemStatus::Served) {
                return Err(ServiceError::invalid_transition(
                    "order item",
                    item.status.as_str(),
                    OrderItemStatus::Served.as_str(),
                ));
            }

            order_repo.update_item_status(item_id, OrderItemStatus::Served)?;
            let served = order_repo
                .get_item(item_id)?
                .ok_or_else(|| ServiceError::not_found("order item", item_id))?;
            journal.updated(tables::ORDER_ITEMS, item_id, &item, &served)?;

            let order = sync_order_status(conn, journal, item.order_id)?;
            let table = SqliteTableRepository::new(conn)
                .get_table(order.table_id)?
                .ok_or_else(|| ServiceError::not_found("table", order.table_id))?;

            if order.status == OrderStatus::Served && table.status != TableStatus::Served {
                set_table_status(
                    conn,
                    journal,
                    &table,
                    TableStatus::Served,
                    table.current_server_id.or(Some(order.server_id)),
                )?;
                notify_table_served(conn, journal, table.table_number, table.id)?;
            }

            let entry = AuditEntry::by(me, "item_served", "order_item", Some(item_id))
                .with_details(json!({
                    "order_id": order.id,
                    "table_number": table.table_number,
                    "order_status": order.status.as_str(),
                }));
            SqliteAuditRepository::new(conn).append(&entry)?;

            order_repo
                .get_order_details(order.id)?
                .ok_or_else(|| ServiceError::not_found("order", order.id))
        })?;

        info!(
            "event=item_serve module=service status=ok order_status={}",
            details.order.status.as_str()
        );
        Ok(details)
    }

    /// Open orders the caller is serving, oldest first.
    pub fn my_orders(&self) -> ServiceResult<Vec<OrderDetails>> {
        self.session.require(Permission::PlaceOrder)?;
        let query = OrderDetailsQuery {
            statuses: OPEN_ORDER_STATUSES.to_vec(),
            server_id: Some(self.session.staff_id()),
            table_id: None,
            require_items: false,
        };
        Ok(SqliteOrderRepository::new(self.conn).list_order_details(&query)?)
    }
}
