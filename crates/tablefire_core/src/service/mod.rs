//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the floor, kitchen and admin workflows.
//! - Enforce role permissions before any read or write.
//! - Keep CLI/UI layers decoupled from storage details.
//!
//! # Invariants
//! - Every multi-row write runs in one SQLite transaction together with its
//!   audit entry, notifications and change-journal rows.
//! - Change events reach live subscribers only after commit.

use crate::auth::AuthError;
use crate::db::DbError;
use crate::model::order::{derive_order_status, Order, OrderId};
use crate::model::staff::StaffId;
use crate::model::table::{DiningTable, TableStatus};
use crate::model::ValidationError;
use crate::realtime::{tables, ChangeFeed, Journal};
use crate::repo::order_repo::{OrderRepository, SqliteOrderRepository};
use crate::repo::table_repo::{SqliteTableRepository, TableRepository};
use crate::repo::RepoError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod admin_service;
pub mod auth_service;
pub mod kitchen_service;
pub mod notification_service;
pub mod server_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Workflow-level error shared by all services.
#[derive(Debug)]
pub enum ServiceError {
    Auth(AuthError),
    Validation(ValidationError),
    NotFound { entity: &'static str, id: String },
    /// Requested status change is not the next legal step.
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },
    /// An order submission without any lines.
    EmptyOrder,
    MenuItemUnavailable(String),
    /// The table has no fully served open order.
    NotReadyForBilling(i64),
    Repo(RepoError),
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_transition(
        entity: &'static str,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Stable machine-readable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth(AuthError::PermissionDenied { .. }) => "permission_denied",
            Self::Auth(_) => "auth_failed",
            Self::Validation(_) => "invalid_input",
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::EmptyOrder => "empty_order",
            Self::MenuItemUnavailable(_) => "menu_item_unavailable",
            Self::NotReadyForBilling(_) => "not_ready_for_billing",
            Self::Repo(RepoError::Conflict(_)) => "conflict",
            Self::Repo(_) => "storage_error",
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidTransition { entity, from, to } => {
                write!(f, "{entity} cannot move from `{from}` to `{to}`")
            }
            Self::EmptyOrder => write!(f, "order must contain at least one item"),
            Self::MenuItemUnavailable(name) => write!(f, "menu item is unavailable: {name}"),
            Self::NotReadyForBilling(table_number) => {
                write!(f, "table {table_number} has no served order to bill")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Auth(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::Db(DbError::Sqlite(value)))
    }
}

/// Runs `work` in one transaction, then publishes its change events.
///
/// Nothing is published when `work` fails or the commit fails.
pub(crate) fn write_unit<T, F>(conn: &Connection, feed: &ChangeFeed, work: F) -> ServiceResult<T>
where
    F: FnOnce(&Connection, &mut Journal<'_>) -> ServiceResult<T>,
{
    let tx = conn.unchecked_transaction()?;
    let (value, events) = {
        let tx_conn: &Connection = &tx;
        let mut journal = Journal::new(tx_conn);
        let value = work(tx_conn, &mut journal)?;
        (value, journal.into_events())
    };
    tx.commit()?;
    feed.publish(&events);
    Ok(value)
}

pub(crate) fn require_table(conn: &Connection, table_number: i64) -> ServiceResult<DiningTable> {
    SqliteTableRepository::new(conn)
        .get_by_number(table_number)?
        .ok_or_else(|| ServiceError::not_found("table", table_number))
}

/// Moves `table` to `status`, journals the change and returns the new row.
pub(crate) fn set_table_status(
    conn: &Connection,
    journal: &mut Journal<'_>,
    table: &DiningTable,
    status: TableStatus,
    current_server_id: Option<StaffId>,
) -> ServiceResult<DiningTable> {
    let repo = SqliteTableRepository::new(conn);
    repo.update_status(table.id, status, current_server_id)?;
    let updated = repo
        .get_table(table.id)?
        .ok_or_else(|| ServiceError::not_found("table", table.id))?;
    journal.updated(tables::DINING_TABLES, table.id, table, &updated)?;
    Ok(updated)
}

/// Re-derives an open order's status from its items and persists it if it moved.
pub(crate) fn sync_order_status(
    conn: &Connection,
    journal: &mut Journal<'_>,
    order_id: OrderId,
) -> ServiceResult<Order> {
    let repo = SqliteOrderRepository::new(conn);
    let order = repo
        .get_order(order_id)?
        .ok_or_else(|| ServiceError::not_found("order", order_id))?;
    let items = repo.list_items(order_id)?;
    let derived = derive_order_status(items.iter().map(|item| item.status));
    if derived == order.status {
        return Ok(order);
    }

    repo.update_order_status(order_id, derived)?;
    let updated = repo
        .get_order(order_id)?
        .ok_or_else(|| ServiceError::not_found("order", order_id))?;
    journal.updated(tables::ORDERS, order_id, &order, &updated)?;
    Ok(updated)
}
