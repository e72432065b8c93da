//! Kitchen workflow: the preparation queue and item advancement.

use super::notification_service::notify_item_prepared;
use super::{sync_order_status, write_unit, ServiceError, ServiceResult};
use crate::auth::guard::Permission;
use crate::auth::session::Session;
use crate::model::audit::AuditEntry;
use crate::model::order::{
    OrderDetails, OrderId, OrderItem, OrderItemId, OrderItemStatus, OrderStatus,
};
use crate::realtime::{tables, ChangeFeed};
use crate::repo::audit_repo::{AuditRepository, SqliteAuditRepository};
use crate::repo::menu_repo::{MenuRepository, SqliteMenuRepository};
use crate::repo::order_repo::{OrderDetailsQuery, OrderRepository, SqliteOrderRepository};
use crate::repo::table_repo::{SqliteTableRepository, TableRepository};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

/// One instance of a dish waiting in the item-wise view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedItem {
    pub item_id: OrderItemId,
    pub order_id: OrderId,
    pub table_number: i64,
    pub quantity: i64,
    pub notes: Option<String>,
    pub status: OrderItemStatus,
}

/// All unserved instances of one dish across open orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemQueueEntry {
    pub menu_item_name: String,
    pub total_quantity: i64,
    pub instances: Vec<QueuedItem>,
}

pub struct KitchenService<'a> {
    conn: &'a Connection,
    feed: &'a ChangeFeed,
    session: &'a Session,
}

impl<'a> KitchenService<'a> {
    pub fn new(conn: &'a Connection, feed: &'a ChangeFeed, session: &'a Session) -> Self {
        Self {
            conn,
            feed,
            session,
        }
    }

    /// Table-wise view: orders still in the kitchen, oldest first.
    pub fn queue(&self) -> ServiceResult<Vec<OrderDetails>> {
        self.session.require(Permission::ViewKitchenQueue)?;
        let query = OrderDetailsQuery {
            statuses: vec![
                OrderStatus::Pending,
                OrderStatus::InProgress,
                OrderStatus::Prepared,
            ],
            server_id: None,
            table_id: None,
            require_items: true,
        };
        Ok(SqliteOrderRepository::new(self.conn).list_order_details(&query)?)
    }

    /// Item-wise view: unserved items grouped by dish name, names ascending.
    pub fn queue_by_item(&self) -> ServiceResult<Vec<ItemQueueEntry>> {
        let mut grouped: BTreeMap<String, ItemQueueEntry> = BTreeMap::new();
        for details in self.queue()? {
            for line in &details.lines {
                if line.item.status == OrderItemStatus::Served {
                    continue;
                }
                let entry = grouped
                    .entry(line.menu_item.name.clone())
                    .or_insert_with(|| ItemQueueEntry {
                        menu_item_name: line.menu_item.name.clone(),
                        total_quantity: 0,
                        instances: Vec::new(),
                    });
                entry.total_quantity += line.item.quantity;
                entry.instances.push(QueuedItem {
                    item_id: line.item.id,
                    order_id: details.order.id,
                    table_number: details.table.table_number,
                    quantity: line.item.quantity,
                    notes: line.item.notes.clone(),
                    status: line.item.status,
                });
            }
        }
        Ok(grouped.into_values().collect())
    }

    /// Moves an item one kitchen step: `pending -> in_progress -> prepared`.
    pub fn advance_item(&self, item_id: OrderItemId) -> ServiceResult<OrderItem> {
        self.session.require(Permission::PrepareItem)?;
        let me = &self.session.staff;

        let advanced = write_unit(self.conn, self.feed, |conn, journal| {
            let order_repo = SqliteOrderRepository::new(conn);
            let item = order_repo
                .get_item(item_id)?
                .ok_or_else(|| ServiceError::not_found("order item", item_id))?;
            let target = match item.status.next() {
                Some(target) if item.status.is_kitchen_step(target) => target,
                other => {
                    return Err(ServiceError::invalid_transition(
                        "order item",
                        item.status.as_str(),
                        other.map_or("none", OrderItemStatus::as_str),
                    ))
                }
            };

            order_repo.update_item_status(item_id, target)?;
            let advanced = order_repo
                .get_item(item_id)?
                .ok_or_else(|| ServiceError::not_found("order item", item_id))?;
            journal.updated(tables::ORDER_ITEMS, item_id, &item, &advanced)?;

            let order = sync_order_status(conn, journal, item.order_id)?;
            let table = SqliteTableRepository::new(conn)
                .get_table(order.table_id)?
                .ok_or_else(|| ServiceError::not_found("table", order.table_id))?;
            let menu_item = SqliteMenuRepository::new(conn)
                .get_menu_item(item.menu_item_id)?
                .ok_or_else(|| ServiceError::not_found("menu item", item.menu_item_id))?;

            if target == OrderItemStatus::Prepared {
                notify_item_prepared(
                    conn,
                    journal,
                    order.server_id,
                    table.table_number,
                    item_id,
                    &menu_item.name,
                )?;
            }

            let entry = AuditEntry::by(
                me,
                format!("item_{}", target.as_str()),
                "order_item",
                Some(item_id),
            )
            .with_details(json!({
                "order_id": order.id,
                "table_number": table.table_number,
                "menu_item": menu_item.name,
            }));
            SqliteAuditRepository::new(conn).append(&entry)?;
            Ok(advanced)
        })?;

        info!(
            "event=item_advance module=service status=ok item_status={}",
            advanced.status.as_str()
        );
        Ok(advanced)
    }
}
