mod common;

use common::{line, menu_item, seeded_floor, sign_in};
use tablefire_core::auth::AuthError;
use tablefire_core::model::invoice::PaymentMethod;
use tablefire_core::model::notification::{KIND_ORDER_CREATED, KIND_TABLE_SERVED};
use tablefire_core::model::order::{NewOrderLine, OrderItemStatus, OrderStatus};
use tablefire_core::model::staff::Role;
use tablefire_core::model::table::TableStatus;
use tablefire_core::service::admin_service::AdminService;
use tablefire_core::service::kitchen_service::KitchenService;
use tablefire_core::service::notification_service::NotificationService;
use tablefire_core::service::server_service::ServerService;
use tablefire_core::service::ServiceError;

#[test]
fn order_moves_from_seating_to_billing() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);
    let kitchen = sign_in(&floor, Role::Kitchen);
    let admin = sign_in(&floor, Role::Admin);
    let floor_ops = ServerService::new(&floor.conn, &floor.feed, &server);
    let kitchen_ops = KitchenService::new(&floor.conn, &floor.feed, &kitchen);
    let admin_ops = AdminService::new(&floor.conn, &floor.feed, &admin);

    let seated = floor_ops.seat_table(3).unwrap();
    assert_eq!(seated.status, TableStatus::Occupied);
    assert_eq!(seated.current_server_id, Some(server.staff_id()));

    let naan = menu_item(&floor, "Butter Naan");
    let chicken = menu_item(&floor, "Butter Chicken");
    let details = floor_ops
        .submit_order(3, &[line(&naan, 2), line(&chicken, 1)])
        .unwrap();
    assert_eq!(details.order.status, OrderStatus::Pending);
    assert_eq!(details.table.status, TableStatus::Active);
    assert_eq!(details.lines.len(), 2);
    assert_eq!(details.total_minor(), 2 * 16_000 + 48_000);

    for line in &details.lines {
        kitchen_ops.advance_item(line.item.id).unwrap();
    }
    let order = floor_ops.my_orders().unwrap().remove(0);
    assert_eq!(order.order.status, OrderStatus::InProgress);

    for line in &details.lines {
        let prepared = kitchen_ops.advance_item(line.item.id).unwrap();
        assert_eq!(prepared.status, OrderItemStatus::Prepared);
    }

    let first = floor_ops.serve_item(details.lines[0].item.id).unwrap();
    assert_eq!(first.order.status, OrderStatus::Prepared);
    assert_eq!(first.table.status, TableStatus::Active);

    let all_served = floor_ops.serve_item(details.lines[1].item.id).unwrap();
    assert_eq!(all_served.order.status, OrderStatus::Served);
    assert_eq!(all_served.table.status, TableStatus::Served);

    let queue = admin_ops.billing_queue().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].table.table_number, 3);
    assert_eq!(queue[0].total_minor, 80_000);

    let invoice = admin_ops.bill_table(3, PaymentMethod::Upi).unwrap();
    assert_eq!(invoice.total_amount_minor, 80_000);
    assert_eq!(invoice.order_id, details.order.id);
    assert!(invoice.invoice_number.starts_with("INV-"));

    let table = floor_ops
        .list_tables()
        .unwrap()
        .into_iter()
        .find(|table| table.table_number == 3)
        .unwrap();
    assert_eq!(table.status, TableStatus::Free);
    assert_eq!(table.current_server_id, None);
    assert!(floor_ops.my_orders().unwrap().is_empty());
    assert!(admin_ops.billing_queue().unwrap().is_empty());
}

#[test]
fn new_order_notifies_kitchen_and_served_table_notifies_admin() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);
    let kitchen = sign_in(&floor, Role::Kitchen);
    let admin = sign_in(&floor, Role::Admin);
    let floor_ops = ServerService::new(&floor.conn, &floor.feed, &server);
    let kitchen_ops = KitchenService::new(&floor.conn, &floor.feed, &kitchen);

    let tea = menu_item(&floor, "Masala Chai");
    let details = floor_ops.submit_order(5, &[line(&tea, 1)]).unwrap();

    let kitchen_inbox = NotificationService::new(&floor.conn, &floor.feed, &kitchen)
        .inbox()
        .unwrap();
    assert_eq!(kitchen_inbox.notifications.len(), 1);
    assert_eq!(kitchen_inbox.notifications[0].kind, KIND_ORDER_CREATED);
    assert_eq!(kitchen_inbox.notifications[0].title, "New Order: Table 5");
    assert_eq!(
        kitchen_inbox.notifications[0].message,
        "Arsath Malik placed a new order"
    );

    let item_id = details.lines[0].item.id;
    kitchen_ops.advance_item(item_id).unwrap();
    kitchen_ops.advance_item(item_id).unwrap();
    floor_ops.serve_item(item_id).unwrap();

    let admin_inbox = NotificationService::new(&floor.conn, &floor.feed, &admin)
        .inbox()
        .unwrap();
    assert_eq!(admin_inbox.notifications.len(), 1);
    assert_eq!(admin_inbox.notifications[0].kind, KIND_TABLE_SERVED);
    assert_eq!(
        admin_inbox.notifications[0].title,
        "Table 5 Ready for Billing"
    );
}

#[test]
fn adding_items_reuses_the_open_order_without_renotifying() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);
    let kitchen = sign_in(&floor, Role::Kitchen);
    let floor_ops = ServerService::new(&floor.conn, &floor.feed, &server);

    let water = menu_item(&floor, "Water");
    let kheer = menu_item(&floor, "Kheer");
    let first = floor_ops.submit_order(1, &[line(&water, 2)]).unwrap();
    let second = floor_ops
        .submit_order(
            1,
            &[NewOrderLine {
                menu_item_id: kheer.id,
                quantity: 1,
                notes: Some("  less sugar ".to_string()),
            }],
        )
        .unwrap();

    assert_eq!(first.order.id, second.order.id);
    assert_eq!(second.lines.len(), 2);
    assert_eq!(second.lines[1].item.notes.as_deref(), Some("less sugar"));

    let inbox = NotificationService::new(&floor.conn, &floor.feed, &kitchen)
        .inbox()
        .unwrap();
    assert_eq!(inbox.notifications.len(), 1);
}

#[test]
fn submit_order_rejects_empty_zero_quantity_and_unavailable_lines() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);
    let admin = sign_in(&floor, Role::Admin);
    let floor_ops = ServerService::new(&floor.conn, &floor.feed, &server);

    assert!(matches!(
        floor_ops.submit_order(2, &[]),
        Err(ServiceError::EmptyOrder)
    ));

    let lassi = menu_item(&floor, "Lassi");
    assert!(matches!(
        floor_ops.submit_order(2, &[line(&lassi, 0)]),
        Err(ServiceError::Validation(_))
    ));

    AdminService::new(&floor.conn, &floor.feed, &admin)
        .set_menu_availability(lassi.id, false)
        .unwrap();
    assert!(matches!(
        floor_ops.submit_order(2, &[line(&lassi, 1)]),
        Err(ServiceError::MenuItemUnavailable(name)) if name == "Lassi"
    ));
    assert!(floor_ops
        .list_menu(Some("Beverages"))
        .unwrap()
        .iter()
        .all(|item| item.name != "Lassi"));

    // Failed submissions leave nothing behind.
    assert!(floor_ops.my_orders().unwrap().is_empty());
    let table = floor_ops
        .list_tables()
        .unwrap()
        .into_iter()
        .find(|table| table.table_number == 2)
        .unwrap();
    assert_eq!(table.status, TableStatus::Free);
}

#[test]
fn seating_requires_a_free_table() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);
    let floor_ops = ServerService::new(&floor.conn, &floor.feed, &server);

    floor_ops.seat_table(4).unwrap();
    assert!(matches!(
        floor_ops.seat_table(4),
        Err(ServiceError::InvalidTransition { entity: "table", .. })
    ));
    assert!(matches!(
        floor_ops.seat_table(42),
        Err(ServiceError::NotFound { entity: "table", .. })
    ));
}

#[test]
fn only_prepared_items_can_be_served() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);
    let floor_ops = ServerService::new(&floor.conn, &floor.feed, &server);

    let coffee = menu_item(&floor, "Coffee");
    let details = floor_ops.submit_order(6, &[line(&coffee, 1)]).unwrap();

    assert!(matches!(
        floor_ops.serve_item(details.lines[0].item.id),
        Err(ServiceError::InvalidTransition { .. })
    ));
}

#[test]
fn roles_cannot_cross_into_other_workflows() {
    let floor = seeded_floor();
    let kitchen = sign_in(&floor, Role::Kitchen);
    let server = sign_in(&floor, Role::Server);
    let coffee = menu_item(&floor, "Coffee");

    let kitchen_as_server = ServerService::new(&floor.conn, &floor.feed, &kitchen);
    assert!(matches!(
        kitchen_as_server.submit_order(1, &[line(&coffee, 1)]),
        Err(ServiceError::Auth(AuthError::PermissionDenied { .. }))
    ));

    let server_as_admin = AdminService::new(&floor.conn, &floor.feed, &server);
    assert!(matches!(
        server_as_admin.bill_table(1, PaymentMethod::Cash),
        Err(ServiceError::Auth(AuthError::PermissionDenied { .. }))
    ));

    let server_as_kitchen = KitchenService::new(&floor.conn, &floor.feed, &server);
    assert!(matches!(
        server_as_kitchen.queue(),
        Err(ServiceError::Auth(AuthError::PermissionDenied { .. }))
    ));
}
