//! Physical dining tables.
//!
//! # Invariants
//! - `table_number` is unique and starts at 1.
//! - `current_server_id` is `None` exactly when the table is `free`.

use super::staff::StaffId;
use super::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TableId = Uuid;

/// Occupancy state of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Nobody seated.
    Free,
    /// Guests seated, nothing ordered yet.
    Occupied,
    /// An open order has items still moving through the kitchen.
    Active,
    /// Every item has been served; waiting for billing.
    Served,
}

impl TableStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Occupied => "occupied",
            Self::Active => "active",
            Self::Served => "served",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(Self::Free),
            "occupied" => Some(Self::Occupied),
            "active" => Some(Self::Active),
            "served" => Some(Self::Served),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiningTable {
    pub id: TableId,
    pub table_number: i64,
    pub status: TableStatus,
    pub current_server_id: Option<StaffId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DiningTable {
    /// Creates a free table with a fresh id.
    pub fn new(table_number: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            table_number,
            status: TableStatus::Free,
            current_server_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.table_number < 1 {
            return Err(ValidationError::InvalidTableNumber(self.table_number));
        }
        check_server_assignment(self.status, self.current_server_id)
    }

    /// Whether guests can be seated right now.
    pub fn can_seat(&self) -> bool {
        self.status == TableStatus::Free
    }
}

/// Free tables have no server; every other status has one.
pub fn check_server_assignment(
    status: TableStatus,
    current_server_id: Option<StaffId>,
) -> Result<(), ValidationError> {
    let is_free = status == TableStatus::Free;
    if is_free == current_server_id.is_some() {
        return Err(ValidationError::ServerAssignmentMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{DiningTable, TableStatus};
    use crate::model::ValidationError;
    use uuid::Uuid;

    #[test]
    fn free_table_must_not_have_server() {
        let mut table = DiningTable::new(3);
        assert!(table.validate().is_ok());

        table.current_server_id = Some(Uuid::new_v4());
        assert_eq!(
            table.validate(),
            Err(ValidationError::ServerAssignmentMismatch)
        );

        table.status = TableStatus::Active;
        assert!(table.validate().is_ok());

        table.current_server_id = None;
        assert_eq!(
            table.validate(),
            Err(ValidationError::ServerAssignmentMismatch)
        );
    }

    #[test]
    fn table_number_starts_at_one() {
        assert_eq!(
            DiningTable::new(0).validate(),
            Err(ValidationError::InvalidTableNumber(0))
        );
    }
}
