//! Restaurant domain model.
//!
//! # Responsibility
//! - Define canonical records for staff, tables, menu, orders, invoices,
//!   notifications and audit entries.
//! - Own the order/item status pipeline and table status rules.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Money is integer minor units; timestamps are epoch milliseconds.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod audit;
pub mod invoice;
pub mod menu;
pub mod notification;
pub mod order;
pub mod report;
pub mod staff;
pub mod table;

/// Validation errors raised before a record is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty after trim.
    EmptyField(&'static str),
    /// Email address does not look like `local@domain`.
    InvalidEmail(String),
    /// Table numbers start at 1.
    InvalidTableNumber(i64),
    /// Order item quantities are `1..=MAX_ITEM_QUANTITY`.
    InvalidQuantity(i64),
    /// Prices and totals are never negative.
    NegativeAmount(i64),
    /// Table status and assigned server disagree.
    ServerAssignmentMismatch,
    /// A computed money amount does not fit in `i64` minor units.
    AmountOverflow,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "{field} must not be empty"),
            Self::InvalidEmail(value) => write!(f, "invalid email address: `{value}`"),
            Self::InvalidTableNumber(value) => {
                write!(f, "table number must be >= 1, got {value}")
            }
            Self::InvalidQuantity(value) => write!(
                f,
                "quantity must be between 1 and {}, got {value}",
                order::MAX_ITEM_QUANTITY
            ),
            Self::NegativeAmount(value) => write!(f, "amount must not be negative, got {value}"),
            Self::ServerAssignmentMismatch => write!(
                f,
                "free tables must not have a server and busy tables must have one"
            ),
            Self::AmountOverflow => write!(f, "amount is too large"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

/// Formats minor units as a rupee amount, e.g. `25000 -> "₹250.00"`.
pub fn format_amount(amount_minor: i64) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{sign}₹{}.{:02}", abs / 100, abs % 100)
}
