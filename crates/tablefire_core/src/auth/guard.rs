//! Role-based permission guard.
//!
//! # Responsibility
//! - Map each staff role to the workflow permissions it holds.
//! - Deny any permission a role does not explicitly list.

use crate::model::staff::Role;
use std::fmt::{Display, Formatter};

/// Workflow operation that requires authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    SeatTable,
    PlaceOrder,
    ServeItem,
    PrepareItem,
    ViewKitchenQueue,
    BillTable,
    ManageMenu,
    ManageStaff,
    ViewStaff,
    ViewReports,
    ViewAuditLog,
}

impl Permission {
    /// Stable id used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SeatTable => "seat_table",
            Self::PlaceOrder => "place_order",
            Self::ServeItem => "serve_item",
            Self::PrepareItem => "prepare_item",
            Self::ViewKitchenQueue => "view_kitchen_queue",
            Self::BillTable => "bill_table",
            Self::ManageMenu => "manage_menu",
            Self::ManageStaff => "manage_staff",
            Self::ViewStaff => "view_staff",
            Self::ViewReports => "view_reports",
            Self::ViewAuditLog => "view_audit_log",
        }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const SERVER_PERMISSIONS: &[Permission] = &[
    Permission::SeatTable,
    Permission::PlaceOrder,
    Permission::ServeItem,
];

const KITCHEN_PERMISSIONS: &[Permission] =
    &[Permission::PrepareItem, Permission::ViewKitchenQueue];

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ViewKitchenQueue,
    Permission::BillTable,
    Permission::ManageMenu,
    Permission::ManageStaff,
    Permission::ViewStaff,
    Permission::ViewReports,
    Permission::ViewAuditLog,
];

/// Permissions granted to `role`.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::Server => SERVER_PERMISSIONS,
        Role::Kitchen => KITCHEN_PERMISSIONS,
        Role::Admin => ADMIN_PERMISSIONS,
    }
}

/// Returns whether `role` holds `permission`.
pub fn role_allows(role: Role, permission: Permission) -> bool {
    role_permissions(role).contains(&permission)
}

#[cfg(test)]
mod tests {
    use super::{role_allows, Permission};
    use crate::model::staff::Role;

    #[test]
    fn floor_actions_stay_with_their_roles() {
        assert!(role_allows(Role::Server, Permission::PlaceOrder));
        assert!(role_allows(Role::Server, Permission::ServeItem));
        assert!(!role_allows(Role::Kitchen, Permission::PlaceOrder));
        assert!(!role_allows(Role::Admin, Permission::PlaceOrder));

        assert!(role_allows(Role::Kitchen, Permission::PrepareItem));
        assert!(!role_allows(Role::Server, Permission::PrepareItem));
        assert!(!role_allows(Role::Admin, Permission::PrepareItem));
    }

    #[test]
    fn only_admin_bills_and_reads_reports() {
        for permission in [
            Permission::BillTable,
            Permission::ViewReports,
            Permission::ManageStaff,
            Permission::ViewAuditLog,
        ] {
            assert!(role_allows(Role::Admin, permission));
            assert!(!role_allows(Role::Server, permission));
            assert!(!role_allows(Role::Kitchen, permission));
        }
    }
}
