#![allow(dead_code)]

use rusqlite::Connection;
use tablefire_core::auth::session::Session;
use tablefire_core::model::menu::MenuItem;
use tablefire_core::model::order::{NewOrderLine, OrderDetails};
use tablefire_core::model::staff::Role;
use tablefire_core::provision::{seed_demo_data, DEMO_PASSWORD};
use tablefire_core::realtime::ChangeFeed;
use tablefire_core::repo::menu_repo::{MenuRepository, SqliteMenuRepository};
use tablefire_core::service::auth_service::AuthService;
use tablefire_core::service::kitchen_service::KitchenService;
use tablefire_core::service::server_service::ServerService;
use tablefire_core::open_db_in_memory;

/// Seeded in-memory restaurant with its change feed.
pub struct Floor {
    pub conn: Connection,
    pub feed: ChangeFeed,
}

pub fn seeded_floor() -> Floor {
    let conn = open_db_in_memory().unwrap();
    let feed = ChangeFeed::new();
    seed_demo_data(&conn, &feed).unwrap();
    Floor { conn, feed }
}

pub fn demo_email(role: Role) -> &'static str {
    match role {
        Role::Server => "server@bhairuha.local",
        Role::Kitchen => "kitchen@bhairuha.local",
        Role::Admin => "admin@bhairuha.local",
    }
}

pub fn sign_in(floor: &Floor, role: Role) -> Session {
    AuthService::new(&floor.conn, &floor.feed)
        .sign_in(demo_email(role), DEMO_PASSWORD)
        .unwrap()
}

pub fn menu_item(floor: &Floor, name: &str) -> MenuItem {
    SqliteMenuRepository::new(&floor.conn)
        .find_by_name(name)
        .unwrap()
        .unwrap_or_else(|| panic!("menu item {name} should be seeded"))
}

pub fn line(item: &MenuItem, quantity: i64) -> NewOrderLine {
    NewOrderLine {
        menu_item_id: item.id,
        quantity,
        notes: None,
    }
}

/// Orders `items` at `table_number` and walks every line to `served`.
pub fn served_table(floor: &Floor, table_number: i64, items: &[(&str, i64)]) -> OrderDetails {
    let server = sign_in(floor, Role::Server);
    let kitchen = sign_in(floor, Role::Kitchen);
    let floor_ops = ServerService::new(&floor.conn, &floor.feed, &server);
    let kitchen_ops = KitchenService::new(&floor.conn, &floor.feed, &kitchen);

    let lines: Vec<NewOrderLine> = items
        .iter()
        .map(|(name, quantity)| line(&menu_item(floor, name), *quantity))
        .collect();
    let details = floor_ops.submit_order(table_number, &lines).unwrap();

    let mut last = details;
    for item_id in last.lines.iter().map(|l| l.item.id).collect::<Vec<_>>() {
        kitchen_ops.advance_item(item_id).unwrap();
        kitchen_ops.advance_item(item_id).unwrap();
        last = floor_ops.serve_item(item_id).unwrap();
    }
    last
}
