//! Staff notifications: fan-out helpers and the per-session inbox.
//!
//! # Invariants
//! - Role broadcasts have no `recipient_id`; direct messages always do.
//! - An inbox lists at most `INBOX_LIMIT` rows, newest first.
//! - Marking read never touches rows the caller cannot see.

use super::{write_unit, ServiceError, ServiceResult};
use crate::auth::session::Session;
use crate::model::notification::{
    Notification, NotificationId, KIND_ITEM_PREPARED, KIND_ORDER_CREATED, KIND_TABLE_SERVED,
};
use crate::model::order::{OrderId, OrderItemId};
use crate::model::staff::{Role, StaffId};
use crate::model::table::TableId;
use crate::realtime::{tables, ChangeFeed, Journal};
use crate::repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeSet;

pub const INBOX_LIMIT: u32 = 50;

/// Inbox view for one staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inbox {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
}

/// Persists `notification` and journals the insert.
pub fn create_notification(
    conn: &Connection,
    journal: &mut Journal<'_>,
    notification: &Notification,
) -> ServiceResult<NotificationId> {
    let id = SqliteNotificationRepository::new(conn).create_notification(notification)?;
    let stored = SqliteNotificationRepository::new(conn)
        .get_notification(id)?
        .ok_or_else(|| ServiceError::not_found("notification", id))?;
    journal.inserted(tables::NOTIFICATIONS, id, &stored)?;
    info!(
        "event=notification_create module=service status=ok kind={} recipient_role={} direct={}",
        notification.kind,
        notification.recipient_role.as_str(),
        notification.recipient_id.is_some()
    );
    Ok(id)
}

/// Tells the kitchen a new order arrived.
pub fn notify_order_created(
    conn: &Connection,
    journal: &mut Journal<'_>,
    table_number: i64,
    order_id: OrderId,
    server_name: &str,
) -> ServiceResult<NotificationId> {
    let notification = Notification::new(
        Role::Kitchen,
        None,
        KIND_ORDER_CREATED,
        format!("New Order: Table {table_number}"),
        format!("{server_name} placed a new order"),
        Some(order_id),
    );
    create_notification(conn, journal, &notification)
}

/// Tells the order's server that one item is ready to take out.
pub fn notify_item_prepared(
    conn: &Connection,
    journal: &mut Journal<'_>,
    server_id: StaffId,
    table_number: i64,
    item_id: OrderItemId,
    item_name: &str,
) -> ServiceResult<NotificationId> {
    let notification = Notification::new(
        Role::Server,
        Some(server_id),
        KIND_ITEM_PREPARED,
        format!("{item_name} Ready"),
        format!("Table {table_number} - {item_name} is prepared"),
        Some(item_id),
    );
    create_notification(conn, journal, &notification)
}

/// Tells admins a table is fully served and can be billed.
pub fn notify_table_served(
    conn: &Connection,
    journal: &mut Journal<'_>,
    table_number: i64,
    table_id: TableId,
) -> ServiceResult<NotificationId> {
    let notification = Notification::new(
        Role::Admin,
        None,
        KIND_TABLE_SERVED,
        format!("Table {table_number} Ready for Billing"),
        format!("All items at table {table_number} have been served"),
        Some(table_id),
    );
    create_notification(conn, journal, &notification)
}

/// Inbox operations for the signed-in staff member.
pub struct NotificationService<'a> {
    conn: &'a Connection,
    feed: &'a ChangeFeed,
    session: &'a Session,
}

impl<'a> NotificationService<'a> {
    pub fn new(conn: &'a Connection, feed: &'a ChangeFeed, session: &'a Session) -> Self {
        Self {
            conn,
            feed,
            session,
        }
    }

    pub fn inbox(&self) -> ServiceResult<Inbox> {
        let repo = SqliteNotificationRepository::new(self.conn);
        Ok(Inbox {
            notifications: repo.list_for(&self.session.staff, INBOX_LIMIT)?,
            unread_count: repo.unread_count(&self.session.staff)?,
        })
    }

    /// Marks the given notifications read. Returns how many changed.
    ///
    /// Repeated ids count once.
    pub fn mark_read(&self, ids: &[NotificationId]) -> ServiceResult<usize> {
        let member = &self.session.staff;
        let ids: Vec<NotificationId> = ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        write_unit(self.conn, self.feed, |conn, journal| {
            let repo = SqliteNotificationRepository::new(conn);
            let mut before = Vec::new();
            for id in &ids {
                if let Some(notification) = repo.get_notification(*id)? {
                    if notification.is_for(member) && !notification.is_read {
                        before.push(notification);
                    }
                }
            }

            let changed = repo.mark_read(member, &ids)?;
            for old in &before {
                let mut new = old.clone();
                new.is_read = true;
                journal.updated(tables::NOTIFICATIONS, old.id, old, &new)?;
            }
            Ok(changed)
        })
    }

    /// Marks every unread notification in the inbox read.
    pub fn mark_all_read(&self) -> ServiceResult<usize> {
        let ids: Vec<NotificationId> = self
            .inbox()?
            .notifications
            .into_iter()
            .filter(|notification| !notification.is_read)
            .map(|notification| notification.id)
            .collect();
        self.mark_read(&ids)
    }
}
