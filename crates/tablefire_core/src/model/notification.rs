//! Staff notifications.
//!
//! # Invariants
//! - A notification with `recipient_id` targets exactly that staff member.
//! - A notification without `recipient_id` targets every member of
//!   `recipient_role`.

use super::staff::{Role, StaffId, StaffMember};
use super::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type NotificationId = Uuid;

/// Kind value for new orders, sent to the kitchen.
pub const KIND_ORDER_CREATED: &str = "order_created";
/// Kind value for prepared items, sent to the order's server.
pub const KIND_ITEM_PREPARED: &str = "item_prepared";
/// Kind value for fully served tables, sent to admins.
pub const KIND_TABLE_SERVED: &str = "table_served";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_role: Role,
    pub recipient_id: Option<StaffId>,
    pub kind: String,
    pub title: String,
    pub message: String,
    /// Entity the notification points at (order, item or table id).
    pub reference_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: i64,
}

impl Notification {
    pub fn new(
        recipient_role: Role,
        recipient_id: Option<StaffId>,
        kind: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        reference_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_role,
            recipient_id,
            kind: kind.into(),
            title: title.into(),
            message: message.into(),
            reference_id,
            is_read: false,
            created_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("kind", &self.kind)?;
        require_text("title", &self.title)?;
        Ok(())
    }

    /// Whether `member` is an addressee of this notification.
    pub fn is_for(&self, member: &StaffMember) -> bool {
        match self.recipient_id {
            Some(recipient_id) => recipient_id == member.id,
            None => self.recipient_role == member.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Notification;
    use crate::model::staff::{Role, StaffMember};

    #[test]
    fn role_broadcast_and_direct_addressing() {
        let kitchen = StaffMember::new("k@x.y", "Kitchen", Role::Kitchen);
        let server = StaffMember::new("s@x.y", "Server", Role::Server);
        let other_server = StaffMember::new("t@x.y", "Other", Role::Server);

        let broadcast = Notification::new(Role::Kitchen, None, "order_created", "t", "m", None);
        assert!(broadcast.is_for(&kitchen));
        assert!(!broadcast.is_for(&server));

        let direct = Notification::new(
            Role::Server,
            Some(server.id),
            "item_prepared",
            "t",
            "m",
            None,
        );
        assert!(direct.is_for(&server));
        assert!(!direct.is_for(&other_server));
    }
}
