//! Orders, order items and the preparation pipeline.
//!
//! # Responsibility
//! - Define the item pipeline `pending -> in_progress -> prepared -> served`.
//! - Derive an open order's status from its items.
//!
//! # Invariants
//! - Items only move to their immediate successor.
//! - `billed` is terminal and never derived from items.
//! - A table has at most one order that is not `billed`.

use super::menu::{MenuItem, MenuItemId};
use super::staff::{StaffId, StaffMember};
use super::table::{DiningTable, TableId};
use super::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type OrderId = Uuid;
pub type OrderItemId = Uuid;

/// Largest quantity accepted on a single order line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Lifecycle of a whole order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Prepared,
    Served,
    Billed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Prepared => "prepared",
            Self::Served => "served",
            Self::Billed => "billed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "prepared" => Some(Self::Prepared),
            "served" => Some(Self::Served),
            "billed" => Some(Self::Billed),
            _ => None,
        }
    }

    /// Open orders still belong to a table; billed ones are history.
    pub fn is_open(self) -> bool {
        self != Self::Billed
    }

    /// Statuses the kitchen still has work for.
    pub fn is_in_kitchen(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress | Self::Prepared)
    }
}

/// Lifecycle of a single ordered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderItemStatus {
    Pending,
    InProgress,
    Prepared,
    Served,
}

impl OrderItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Prepared => "prepared",
            Self::Served => "served",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "prepared" => Some(Self::Prepared),
            "served" => Some(Self::Served),
            _ => None,
        }
    }

    /// Immediate successor in the pipeline; `served` has none.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::InProgress),
            Self::InProgress => Some(Self::Prepared),
            Self::Prepared => Some(Self::Served),
            Self::Served => None,
        }
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    /// Transitions performed by kitchen staff.
    pub fn is_kitchen_step(self, target: Self) -> bool {
        self.can_transition_to(target) && target != Self::Served
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub table_id: TableId,
    pub server_id: StaffId,
    pub status: OrderStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Opens a new pending order for a table.
    pub fn open(table_id: TableId, server_id: StaffId) -> Self {
        Self {
            id: Uuid::new_v4(),
            table_id,
            server_id,
            status: OrderStatus::Pending,
            created_at: 0,
            updated_at: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub menu_item_id: MenuItemId,
    pub quantity: i64,
    pub notes: Option<String>,
    pub status: OrderItemStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl OrderItem {
    /// Creates a pending item. Blank notes are stored as `None`.
    pub fn new(
        order_id: OrderId,
        menu_item_id: MenuItemId,
        quantity: i64,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            menu_item_id,
            quantity,
            notes: notes
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            status: OrderItemStatus::Pending,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_ITEM_QUANTITY).contains(&self.quantity) {
            return Err(ValidationError::InvalidQuantity(self.quantity));
        }
        Ok(())
    }
}

/// Requested line when a server submits an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub menu_item_id: MenuItemId,
    pub quantity: i64,
    pub notes: Option<String>,
}

/// Derives an open order's status from its item statuses.
///
/// - no items, or all `pending` -> `pending`
/// - all `served` -> `served`
/// - all at least `prepared` -> `prepared`
/// - anything else -> `in_progress`
pub fn derive_order_status<I>(item_statuses: I) -> OrderStatus
where
    I: IntoIterator<Item = OrderItemStatus>,
{
    let mut any = false;
    let mut all_pending = true;
    let mut all_served = true;
    let mut all_prepared = true;

    for status in item_statuses {
        any = true;
        all_pending &= status == OrderItemStatus::Pending;
        all_served &= status == OrderItemStatus::Served;
        all_prepared &= status >= OrderItemStatus::Prepared;
    }

    if !any || all_pending {
        OrderStatus::Pending
    } else if all_served {
        OrderStatus::Served
    } else if all_prepared {
        OrderStatus::Prepared
    } else {
        OrderStatus::InProgress
    }
}

/// One ordered item joined with its menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item: OrderItem,
    pub menu_item: MenuItem,
}

impl OrderLine {
    pub fn line_total_minor(&self) -> Result<i64, ValidationError> {
        self.menu_item
            .price_minor
            .checked_mul(self.item.quantity)
            .ok_or(ValidationError::AmountOverflow)
    }
}

/// Order joined with its table, server and lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub table: DiningTable,
    pub server: StaffMember,
    pub lines: Vec<OrderLine>,
}

impl OrderDetails {
    /// Sum of `price * quantity` over all lines.
    pub fn total_minor(&self) -> Result<i64, ValidationError> {
        self.lines.iter().try_fold(0i64, |total, line| {
            total
                .checked_add(line.line_total_minor()?)
                .ok_or(ValidationError::AmountOverflow)
        })
    }
}
