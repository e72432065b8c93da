//! Demo data provisioning.
//!
//! # Invariants
//! - Running the seed twice leaves the database as after the first run.
//! - Existing accounts keep their password; only missing ones are created.

use crate::model::menu::MenuItem;
use crate::model::staff::Role;
use crate::model::table::DiningTable;
use crate::realtime::{tables, ChangeFeed};
use crate::repo::menu_repo::{MenuRepository, SqliteMenuRepository};
use crate::repo::staff_repo::{SqliteStaffRepository, StaffRepository};
use crate::repo::table_repo::{SqliteTableRepository, TableRepository};
use crate::service::auth_service::{register_staff, NewStaff};
use crate::service::{write_unit, ServiceError, ServiceResult};
use log::info;
use rusqlite::Connection;
use serde::Serialize;

pub const DEMO_PASSWORD: &str = "password";
pub const DEMO_TABLE_COUNT: i64 = 10;

const DEMO_ACCOUNTS: [(&str, &str, Role); 3] = [
    ("server@bhairuha.local", "Arsath Malik", Role::Server),
    ("kitchen@bhairuha.local", "Bhairuha Kitchen", Role::Kitchen),
    ("admin@bhairuha.local", "Bhairuha Admin", Role::Admin),
];

/// (name, category, price in rupees, description)
const DEMO_MENU: &[(&str, &str, i64, &str)] = &[
    ("Spring Rolls", "Appetizers", 250, "Crispy vegetable spring rolls with sweet chili sauce"),
    ("Samosa (3pc)", "Appetizers", 200, "Golden fried pastries with spiced potato filling"),
    ("Pakora Mix", "Appetizers", 280, "Mixed vegetable fritters with tamarind sauce"),
    ("Paneer Tikka", "Appetizers", 350, "Grilled cottage cheese cubes with yogurt marinade"),
    ("Chicken Tikka", "Appetizers", 380, "Marinated chicken pieces grilled to perfection"),
    ("Fish Tikka", "Appetizers", 420, "Fresh fish cubes with spice marinade"),
    ("Garlic Bread", "Appetizers", 180, "Toasted bread with garlic butter and herbs"),
    ("Cheese Garlic Bread", "Appetizers", 220, "Garlic bread topped with melted cheese"),
    ("Onion Bhaji", "Appetizers", 220, "Crispy onion rings with gram flour coating"),
    ("Mushroom Momo", "Appetizers", 260, "Steamed dumplings with mushroom filling"),
    ("Paneer Butter Masala", "Mains - Veg", 420, "Soft paneer in creamy tomato sauce with spices"),
    ("Chana Masala", "Mains - Veg", 280, "Chickpeas in aromatic tomato-based curry"),
    ("Aloo Gobi", "Mains - Veg", 260, "Potatoes and cauliflower with turmeric and spices"),
    ("Palak Paneer", "Mains - Veg", 380, "Paneer in spinach-based creamy sauce"),
    ("Mushroom Masala", "Mains - Veg", 350, "Button mushrooms in spiced creamy sauce"),
    ("Vegetable Biryani", "Mains - Veg", 380, "Fragrant basmati rice with mixed vegetables"),
    ("Paneer Biryani", "Mains - Veg", 420, "Basmati rice layered with paneer and aromatic spices"),
    ("Masala Dosa", "Mains - Veg", 320, "Crispy crepe with spiced potato filling"),
    ("Paneer Dosa", "Mains - Veg", 340, "Crispy crepe with paneer and potato filling"),
    ("Mixed Vegetable Curry", "Mains - Veg", 310, "Seasonal vegetables in aromatic gravy"),
    ("Butter Chicken", "Mains - Non-Veg", 480, "Tender chicken in rich creamy tomato sauce"),
    ("Chicken Tikka Masala", "Mains - Non-Veg", 500, "Grilled chicken in aromatic spiced cream sauce"),
    ("Chicken Chettinad", "Mains - Non-Veg", 450, "Chicken with roasted spices and coconut"),
    ("Lamb Curry", "Mains - Non-Veg", 520, "Tender lamb pieces in aromatic spiced gravy"),
    ("Lamb Biryani", "Mains - Non-Veg", 520, "Fragrant basmati rice with lamb and spices"),
    ("Fish Curry", "Mains - Non-Veg", 450, "Fresh fish in aromatic coconut-based sauce"),
    ("Fish Tikka Masala", "Mains - Non-Veg", 480, "Grilled fish in creamy tomato sauce"),
    ("Shrimp Curry", "Mains - Non-Veg", 520, "Tender shrimp in spiced coconut sauce"),
    ("Chicken Biryani", "Mains - Non-Veg", 480, "Basmati rice with tender chicken and spices"),
    ("Tandoori Chicken", "Mains - Non-Veg", 420, "Chicken marinated and clay-oven roasted"),
    ("Fried Rice", "Rice & Bread", 280, "Wok-tossed rice with vegetables and sauce"),
    ("Egg Fried Rice", "Rice & Bread", 320, "Fried rice with scrambled eggs"),
    ("Chicken Fried Rice", "Rice & Bread", 380, "Fried rice with diced chicken"),
    ("Plain Rice", "Rice & Bread", 100, "Steamed basmati rice"),
    ("Garlic Naan", "Rice & Bread", 180, "Flatbread topped with garlic and cilantro"),
    ("Butter Naan", "Rice & Bread", 160, "Classic Indian flatbread with butter"),
    ("Cheese Naan", "Rice & Bread", 220, "Flatbread stuffed with melted cheese"),
    ("Roti/Chapati", "Rice & Bread", 40, "Whole wheat Indian flatbread"),
    ("Paratha", "Rice & Bread", 120, "Layered Indian flatbread with ghee"),
    ("Pulao", "Rice & Bread", 240, "Aromatic rice with whole spices"),
    ("Gulab Jamun", "Desserts", 180, "Soft milk solids in sugar syrup"),
    ("Rasgulla", "Desserts", 160, "Soft cheese balls in sugar syrup"),
    ("Kheer", "Desserts", 150, "Rice pudding with milk and cardamom"),
    ("Jalebi", "Desserts", 140, "Spiral-shaped fried sweet"),
    ("Barfi", "Desserts", 200, "Milk fudge with nuts"),
    ("Halwa", "Desserts", 190, "Semolina or carrot pudding"),
    ("Ice Cream", "Desserts", 120, "Vanilla, chocolate, or strawberry"),
    ("Kulfi", "Desserts", 130, "Traditional Indian ice cream on stick"),
    ("Water", "Beverages", 20, "Mineral water"),
    ("Masala Chai", "Beverages", 80, "Spiced Indian tea"),
    ("Coffee", "Beverages", 100, "Hot brewed coffee"),
    ("Lassi", "Beverages", 120, "Yogurt-based sweet or salt drink"),
    ("Mango Shake", "Beverages", 180, "Mango smoothie with milk"),
    ("Fresh Juice", "Beverages", 140, "Orange, pineapple, or mixed fruit juice"),
    ("Iced Tea", "Beverages", 100, "Chilled sweet or lime tea"),
    ("Smoothie Bowl", "Beverages", 250, "Thick smoothie with granola and fruit toppings"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Created,
    AlreadyExists,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyExists => "already_exists",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub accounts: Vec<(String, AccountStatus)>,
    pub tables_created: usize,
    pub tables_total: usize,
    pub menu_items_created: usize,
    pub menu_items_total: usize,
}

/// Creates the demo accounts, tables and menu where missing.
pub fn seed_demo_data(conn: &Connection, feed: &ChangeFeed) -> ServiceResult<ProvisionReport> {
    let report = write_unit(conn, feed, |conn, journal| {
        let staff_repo = SqliteStaffRepository::new(conn);
        let mut accounts = Vec::with_capacity(DEMO_ACCOUNTS.len());
        for (email, full_name, role) in DEMO_ACCOUNTS {
            let status = if staff_repo.find_by_email(email)?.is_some() {
                AccountStatus::AlreadyExists
            } else {
                let new_staff = NewStaff {
                    email: email.to_string(),
                    password: DEMO_PASSWORD.to_string(),
                    full_name: full_name.to_string(),
                    role,
                };
                register_staff(conn, journal, &new_staff)?;
                AccountStatus::Created
            };
            accounts.push((email.to_string(), status));
        }

        let table_repo = SqliteTableRepository::new(conn);
        let mut tables_created = 0;
        for table_number in 1..=DEMO_TABLE_COUNT {
            let table = DiningTable::new(table_number);
            if table_repo.create_table_if_missing(&table)? {
                let stored = table_repo
                    .get_table(table.id)?
                    .ok_or_else(|| ServiceError::not_found("table", table.id))?;
                journal.inserted(tables::DINING_TABLES, stored.id, &stored)?;
                tables_created += 1;
            }
        }

        let menu_repo = SqliteMenuRepository::new(conn);
        let mut menu_items_created = 0;
        for (name, category, rupees, description) in DEMO_MENU {
            if menu_repo.find_by_name(name)?.is_some() {
                continue;
            }
            let item = MenuItem::new(*name, *category, rupees * 100).with_description(*description);
            let id = menu_repo.upsert_menu_item(&item)?;
            let stored = menu_repo
                .get_menu_item(id)?
                .ok_or_else(|| ServiceError::not_found("menu item", id))?;
            journal.inserted(tables::MENU_ITEMS, id, &stored)?;
            menu_items_created += 1;
        }

        Ok(ProvisionReport {
            accounts,
            tables_created,
            tables_total: table_repo.list_tables()?.len(),
            menu_items_created,
            menu_items_total: menu_repo.list_menu(&Default::default())?.len(),
        })
    })?;

    info!(
        "event=seed_demo module=provision status=ok tables_created={} menu_items_created={}",
        report.tables_created, report.menu_items_created
    );
    Ok(report)
}
