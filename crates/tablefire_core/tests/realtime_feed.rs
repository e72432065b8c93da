mod common;

use common::{line, menu_item, seeded_floor, served_table, sign_in};
use tablefire_core::model::order::{OrderItem, OrderItemStatus};
use tablefire_core::model::staff::Role;
use tablefire_core::model::table::{DiningTable, TableStatus};
use tablefire_core::realtime::journal::{latest_seq, read_after};
use tablefire_core::realtime::{tables, ChangeFilter, ChangeKind, LiveRecord, LiveTable};
use tablefire_core::repo::order_repo::{OrderRepository, SqliteOrderRepository};
use tablefire_core::repo::table_repo::{SqliteTableRepository, TableRepository};
use tablefire_core::service::kitchen_service::KitchenService;
use tablefire_core::service::server_service::ServerService;

#[test]
fn live_table_follows_floor_changes_after_snapshot() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);

    let (mut live, mut subscription) = LiveTable::<DiningTable>::subscribe_and_load(
        &floor.feed,
        &floor.conn,
        ChangeFilter::table(tables::DINING_TABLES),
        |conn| SqliteTableRepository::new(conn).list_tables(),
    )
    .unwrap();
    assert_eq!(live.rows().len(), 10);

    let seated = ServerService::new(&floor.conn, &floor.feed, &server)
        .seat_table(2)
        .unwrap();
    assert_eq!(live.sync(&mut subscription).unwrap(), 1);
    assert_eq!(
        live.get(&seated.id.to_string()).map(|table| table.status),
        Some(TableStatus::Occupied)
    );
}

#[test]
fn order_item_mirror_is_scoped_to_one_order() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);
    let kitchen = sign_in(&floor, Role::Kitchen);
    let floor_ops = ServerService::new(&floor.conn, &floor.feed, &server);
    let kitchen_ops = KitchenService::new(&floor.conn, &floor.feed, &kitchen);

    let chai = menu_item(&floor, "Masala Chai");
    let watched = floor_ops.submit_order(1, &[line(&chai, 1)]).unwrap();
    let order_id = watched.order.id;

    let (mut items, mut subscription) = LiveTable::<OrderItem>::subscribe_and_load(
        &floor.feed,
        &floor.conn,
        ChangeFilter::table(tables::ORDER_ITEMS).column_eq("order_id", order_id.to_string()),
        |conn| SqliteOrderRepository::new(conn).list_items(order_id),
    )
    .unwrap();

    floor_ops.submit_order(2, &[line(&chai, 4)]).unwrap();
    floor_ops.submit_order(1, &[line(&chai, 2)]).unwrap();
    kitchen_ops.advance_item(watched.lines[0].item.id).unwrap();

    items.sync(&mut subscription).unwrap();
    assert_eq!(items.rows().len(), 2);
    assert!(items.rows().iter().all(|item| item.order_id == order_id));
    assert_eq!(items.rows()[0].status, OrderItemStatus::InProgress);
    assert_eq!(items.rows()[1].quantity, 2);
}

#[test]
fn failed_writes_publish_and_journal_nothing() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);
    let mut subscription = floor.feed.subscribe(ChangeFilter::table(tables::ORDERS));
    let before = latest_seq(&floor.conn).unwrap();

    let lassi = menu_item(&floor, "Lassi");
    let result = ServerService::new(&floor.conn, &floor.feed, &server)
        .submit_order(3, &[line(&lassi, 1), line(&lassi, 0)]);

    assert!(result.is_err());
    assert!(subscription.drain().is_empty());
    assert_eq!(latest_seq(&floor.conn).unwrap(), before);
}

#[test]
fn journal_lets_another_reader_catch_up() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("floor.db");
    let writer = tablefire_core::open_db(&path).unwrap();
    let feed = tablefire_core::ChangeFeed::new();
    tablefire_core::provision::seed_demo_data(&writer, &feed).unwrap();

    let reader = tablefire_core::open_db(&path).unwrap();
    let mut live = LiveTable::<DiningTable>::new();
    live.load(
        SqliteTableRepository::new(&reader).list_tables().unwrap(),
        latest_seq(&reader).unwrap(),
    );

    let session = tablefire_core::service::auth_service::AuthService::new(&writer, &feed)
        .sign_in("server@bhairuha.local", tablefire_core::provision::DEMO_PASSWORD)
        .unwrap();
    ServerService::new(&writer, &feed, &session)
        .seat_table(9)
        .unwrap();

    assert_eq!(live.catch_up(&reader).unwrap(), 1);
    let nine = live
        .rows()
        .iter()
        .find(|table| table.table_number == 9)
        .unwrap();
    assert_eq!(nine.status, TableStatus::Occupied);
    assert_eq!(live.last_seq(), latest_seq(&reader).unwrap());
}

#[test]
fn journal_records_old_and_new_images_for_updates() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);
    let start = latest_seq(&floor.conn).unwrap();

    ServerService::new(&floor.conn, &floor.feed, &server)
        .seat_table(4)
        .unwrap();

    let events = read_after(&floor.conn, start, 10).unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.table, tables::DINING_TABLES);
    assert_eq!(event.kind, ChangeKind::Update);
    assert_eq!(event.old.as_ref().unwrap()["status"], "free");
    assert_eq!(event.new.as_ref().unwrap()["status"], "occupied");
}

#[test]
fn live_record_tracks_a_single_table() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);
    let table = SqliteTableRepository::new(&floor.conn)
        .get_by_number(5)
        .unwrap()
        .unwrap();

    let mut record = LiveRecord::new(
        table.id.to_string(),
        Some(table.clone()),
        latest_seq(&floor.conn).unwrap(),
    );
    let mut subscription = floor.feed.subscribe(record.filter());

    let floor_ops = ServerService::new(&floor.conn, &floor.feed, &server);
    floor_ops.seat_table(6).unwrap();
    floor_ops.seat_table(5).unwrap();

    assert_eq!(record.sync(&mut subscription).unwrap(), 1);
    assert_eq!(
        record.value().map(|table| table.status),
        Some(TableStatus::Occupied)
    );
}

#[test]
fn served_tables_mirror_gains_tables_as_they_finish() {
    let floor = seeded_floor();

    let (mut ready, mut subscription) = LiveTable::<DiningTable>::subscribe_and_load(
        &floor.feed,
        &floor.conn,
        ChangeFilter::table(tables::DINING_TABLES).column_eq("status", "served"),
        |conn| {
            Ok(SqliteTableRepository::new(conn)
                .list_tables()?
                .into_iter()
                .filter(|table| table.status == TableStatus::Served)
                .collect())
        },
    )
    .unwrap();
    assert!(ready.rows().is_empty());

    served_table(&floor, 6, &[("Lassi", 1)]);
    ready.sync(&mut subscription).unwrap();

    assert_eq!(subscription.missed(), 0);
    assert_eq!(
        ready
            .rows()
            .iter()
            .map(|table| table.table_number)
            .collect::<Vec<_>>(),
        vec![6]
    );
}

#[test]
fn dropped_mirrors_unsubscribe_from_the_feed() {
    let floor = seeded_floor();
    let server = sign_in(&floor, Role::Server);

    let subscriptions: Vec<_> = (0..50)
        .map(|_| floor.feed.subscribe(ChangeFilter::table(tables::INVOICES)))
        .collect();
    assert_eq!(floor.feed.subscriber_count(), 50);
    drop(subscriptions);

    ServerService::new(&floor.conn, &floor.feed, &server)
        .seat_table(1)
        .unwrap();
    assert_eq!(floor.feed.subscriber_count(), 0);
}
