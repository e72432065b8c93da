mod common;

use tablefire_core::model::staff::Role;
use tablefire_core::open_db_in_memory;
use tablefire_core::provision::{seed_demo_data, AccountStatus, DEMO_TABLE_COUNT};
use tablefire_core::realtime::journal::latest_seq;
use tablefire_core::realtime::ChangeFeed;
use tablefire_core::repo::menu_repo::{MenuRepository, SqliteMenuRepository};
use tablefire_core::repo::table_repo::{SqliteTableRepository, TableRepository};
use tablefire_core::model::table::TableStatus;

#[test]
fn seeding_twice_changes_nothing_the_second_time() {
    let conn = open_db_in_memory().unwrap();
    let feed = ChangeFeed::new();

    let first = seed_demo_data(&conn, &feed).unwrap();
    assert!(first
        .accounts
        .iter()
        .all(|(_, status)| *status == AccountStatus::Created));
    assert_eq!(first.tables_created, DEMO_TABLE_COUNT as usize);
    assert_eq!(first.menu_items_created, first.menu_items_total);
    let seq_after_first = latest_seq(&conn).unwrap();

    let second = seed_demo_data(&conn, &feed).unwrap();
    assert!(second
        .accounts
        .iter()
        .all(|(_, status)| *status == AccountStatus::AlreadyExists));
    assert_eq!(second.tables_created, 0);
    assert_eq!(second.menu_items_created, 0);
    assert_eq!(second.tables_total, first.tables_total);
    assert_eq!(latest_seq(&conn).unwrap(), seq_after_first);
}

#[test]
fn seeded_floor_is_free_and_menu_is_categorized() {
    let floor = common::seeded_floor();

    let tables = SqliteTableRepository::new(&floor.conn).list_tables().unwrap();
    let numbers: Vec<i64> = tables.iter().map(|t| t.table_number).collect();
    assert_eq!(numbers, (1..=DEMO_TABLE_COUNT).collect::<Vec<_>>());
    assert!(tables.iter().all(|t| t.status == TableStatus::Free));

    let categories = SqliteMenuRepository::new(&floor.conn)
        .list_categories()
        .unwrap();
    assert_eq!(
        categories,
        vec![
            "Appetizers",
            "Beverages",
            "Desserts",
            "Mains - Non-Veg",
            "Mains - Veg",
            "Rice & Bread",
        ]
    );

    let samosa = common::menu_item(&floor, "samosa (3pc)");
    assert_eq!(samosa.price_minor, 20_000);
    assert_eq!(common::sign_in(&floor, Role::Admin).role(), Role::Admin);
}
