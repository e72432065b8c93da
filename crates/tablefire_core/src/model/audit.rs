//! Append-only audit trail of staff actions.

use super::staff::{Role, StaffId, StaffMember};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub user_id: StaffId,
    pub user_role: Role,
    /// Stable snake_case action name, e.g. `order_items_added`.
    pub action: String,
    /// Entity family the action touched, e.g. `order`.
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: Option<Value>,
    pub created_at: i64,
}

impl AuditEntry {
    /// Records `action` performed by `actor` on one entity.
    pub fn by(
        actor: &StaffMember,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: actor.id,
            user_role: actor.role,
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id,
            details: None,
            created_at: 0,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}
