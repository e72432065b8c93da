mod common;

use common::{line, menu_item, seeded_floor, sign_in};
use tablefire_core::model::notification::Notification;
use tablefire_core::model::staff::Role;
use tablefire_core::realtime::journal::{latest_seq, read_after};
use tablefire_core::realtime::{tables, ChangeKind, Journal};
use tablefire_core::service::notification_service::{create_notification, NotificationService};
use tablefire_core::service::server_service::ServerService;

#[test]
fn inbox_shows_role_broadcasts_and_direct_messages_newest_first() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);
    let kitchen = sign_in(&floor, Role::Kitchen);

    let mut journal = Journal::new(&floor.conn);
    let broadcast = Notification::new(Role::Server, None, "shift_note", "Staff meal at 4", "", None);
    let direct = Notification::new(
        Role::Server,
        Some(server.staff_id()),
        "item_prepared",
        "Kheer Ready",
        "Table 2 - Kheer is prepared",
        None,
    );
    let for_kitchen = Notification::new(Role::Kitchen, None, "shift_note", "Deep clean", "", None);
    for notification in [&broadcast, &direct, &for_kitchen] {
        create_notification(&floor.conn, &mut journal, notification).unwrap();
    }

    let inbox = NotificationService::new(&floor.conn, &floor.feed, &server)
        .inbox()
        .unwrap();
    let ids: Vec<_> = inbox.notifications.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![direct.id, broadcast.id]);
    assert_eq!(inbox.unread_count, 2);

    let kitchen_inbox = NotificationService::new(&floor.conn, &floor.feed, &kitchen)
        .inbox()
        .unwrap();
    assert_eq!(kitchen_inbox.notifications.len(), 1);
    assert_eq!(kitchen_inbox.notifications[0].id, for_kitchen.id);
}

#[test]
fn mark_read_ignores_rows_the_caller_cannot_see() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);
    let kitchen = sign_in(&floor, Role::Kitchen);

    ServerService::new(&floor.conn, &floor.feed, &server)
        .submit_order(1, &[line(&menu_item(&floor, "Water"), 1)])
        .unwrap();
    let kitchen_inbox = NotificationService::new(&floor.conn, &floor.feed, &kitchen);
    let order_note = kitchen_inbox.inbox().unwrap().notifications[0].id;

    let server_inbox = NotificationService::new(&floor.conn, &floor.feed, &server);
    assert_eq!(server_inbox.mark_read(&[order_note]).unwrap(), 0);
    assert_eq!(kitchen_inbox.inbox().unwrap().unread_count, 1);

    assert_eq!(kitchen_inbox.mark_read(&[order_note]).unwrap(), 1);
    assert_eq!(kitchen_inbox.mark_read(&[order_note]).unwrap(), 0);
    let after = kitchen_inbox.inbox().unwrap();
    assert_eq!(after.unread_count, 0);
    assert!(after.notifications[0].is_read);
}

#[test]
fn inbox_is_capped_at_fifty() {
    let floor = seeded_floor();
    let kitchen = sign_in(&floor, Role::Kitchen);

    let mut journal = Journal::new(&floor.conn);
    for index in 0..55 {
        let notification = Notification::new(
            Role::Kitchen,
            None,
            "order_created",
            format!("New Order: Table {index}"),
            "",
            None,
        );
        create_notification(&floor.conn, &mut journal, &notification).unwrap();
    }

    let service = NotificationService::new(&floor.conn, &floor.feed, &kitchen);
    let inbox = service.inbox().unwrap();
    assert_eq!(inbox.notifications.len(), 50);
    assert_eq!(inbox.unread_count, 55);
    assert_eq!(inbox.notifications[0].title, "New Order: Table 54");

    assert_eq!(service.mark_all_read().unwrap(), 50);
    assert_eq!(service.inbox().unwrap().unread_count, 5);
}

#[test]
fn repeated_ids_mark_and_journal_once() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);

    let mut journal = Journal::new(&floor.conn);
    let note = Notification::new(Role::Server, None, "shift_note", "Briefing at 5", "", None);
    create_notification(&floor.conn, &mut journal, &note).unwrap();
    let inserted = journal.into_events();
    assert_eq!(inserted.len(), 1);
    assert!(inserted[0].new.as_ref().unwrap()["created_at"].as_i64().unwrap() > 0);

    let before = latest_seq(&floor.conn).unwrap();
    let changed = NotificationService::new(&floor.conn, &floor.feed, &server)
        .mark_read(&[note.id, note.id, note.id])
        .unwrap();
    assert_eq!(changed, 1);

    let events = read_after(&floor.conn, before, 10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].table, tables::NOTIFICATIONS);
    assert_eq!(events[0].kind, ChangeKind::Update);
    assert_eq!(events[0].new.as_ref().unwrap()["is_read"], true);
}
