//! Change capture and live views over the restaurant tables.
//!
//! # Responsibility
//! - Record every data write as a durable, ordered change event.
//! - Fan committed events out to in-process subscribers.
//! - Keep client-side mirrors of a table or a single row in sync.
//!
//! # Invariants
//! - Journal rows are written in the same transaction as the data they
//!   describe, so a committed write always has its event and vice versa.
//! - `seq` is strictly increasing; consumers use it to drop replays.
//! - Subscribers must subscribe before reading their initial snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod feed;
pub mod journal;
pub mod live;

pub use feed::{ChangeFeed, ChangeFilter, Subscription};
pub use journal::Journal;
pub use live::{LiveError, LiveRecord, LiveRow, LiveTable};

/// Journal table names for the mirrored aggregates.
pub mod tables {
    pub const STAFF: &str = "staff";
    pub const DINING_TABLES: &str = "dining_tables";
    pub const MENU_ITEMS: &str = "menu_items";
    pub const ORDERS: &str = "orders";
    pub const ORDER_ITEMS: &str = "order_items";
    pub const INVOICES: &str = "invoices";
    pub const NOTIFICATIONS: &str = "notifications";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One committed row change.
///
/// `new` is present for inserts and updates, `old` for updates and deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub seq: i64,
    pub table: String,
    pub kind: ChangeKind,
    pub row_id: String,
    pub new: Option<Value>,
    pub old: Option<Value>,
    pub created_at: i64,
}

impl ChangeEvent {
    /// Row image a filter should look at: `new`, or `old` for deletes.
    pub fn current_row(&self) -> Option<&Value> {
        match self.kind {
            ChangeKind::Delete => self.old.as_ref(),
            ChangeKind::Insert | ChangeKind::Update => self.new.as_ref(),
        }
    }
}
