//! Admin workflow: billing, menu and staff management, reports.
//!
//! # Invariants
//! - Only a `served` table whose open order is `served` can be billed.
//! - Billing closes the order (`billed`) and frees the table in one transaction.
//! - Invoice numbers count up per UTC day: `INV-YYYYMMDD-NNNN`.

use super::{require_table, set_table_status, write_unit, ServiceError, ServiceResult};
use crate::auth::guard::Permission;
use crate::auth::session::Session;
use crate::db::now_epoch_ms;
use crate::model::audit::AuditEntry;
use crate::model::invoice::{
    format_invoice_number, invoice_number_prefix, utc_day, Invoice, PaymentMethod,
};
use crate::model::menu::{MenuItem, MenuItemId};
use crate::model::order::{OrderDetails, OrderStatus};
use crate::model::report::SalesReport;
use crate::model::staff::{StaffId, StaffMember};
use crate::model::table::{DiningTable, TableStatus};
use crate::realtime::{tables, ChangeFeed};
use crate::repo::audit_repo::{AuditRepository, SqliteAuditRepository};
use crate::repo::invoice_repo::{InvoiceRepository, SqliteInvoiceRepository};
use crate::repo::menu_repo::{MenuQuery, MenuRepository, SqliteMenuRepository};
use crate::repo::order_repo::{OrderRepository, SqliteOrderRepository};
use crate::repo::staff_repo::{SqliteStaffRepository, StaffRepository};
use crate::repo::table_repo::{SqliteTableRepository, TableRepository};
use chrono::NaiveDate;
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

/// A served table waiting for payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillableTable {
    pub table: DiningTable,
    pub order: OrderDetails,
    pub total_minor: i64,
}

pub struct AdminService<'a> {
    conn: &'a Connection,
    feed: &'a ChangeFeed,
    session: &'a Session,
}

impl<'a> AdminService<'a> {
    pub fn new(conn: &'a Connection, feed: &'a ChangeFeed, session: &'a Session) -> Self {
        Self {
            conn,
            feed,
            session,
        }
    }

    /// Served tables with their order and amount due, by table number.
    pub fn billing_queue(&self) -> ServiceResult<Vec<BillableTable>> {
        self.session.require(Permission::BillTable)?;
        let order_repo = SqliteOrderRepository::new(self.conn);

        let mut queue = Vec::new();
        for table in SqliteTableRepository::new(self.conn).list_by_status(TableStatus::Served)? {
            let Some(order) = order_repo.find_open_order_for_table(table.id)? else {
                continue;
            };
            if order.status != OrderStatus::Served {
                continue;
            }
            let details = order_repo
                .get_order_details(order.id)?
                .ok_or_else(|| ServiceError::not_found("order", order.id))?;
            queue.push(BillableTable {
                total_minor: details.total_minor()?,
                table,
                order: details,
            });
        }
        Ok(queue)
    }

    /// Issues the invoice for a served table and frees it.
    pub fn bill_table(
        &self,
        table_number: i64,
        payment_method: PaymentMethod,
    ) -> ServiceResult<Invoice> {
        self.session.require(Permission::BillTable)?;
        let me = &self.session.staff;

        let invoice = write_unit(self.conn, self.feed, |conn, journal| {
            let table = require_table(conn, table_number)?;
            if table.status != TableStatus::Served {
                return Err(ServiceError::NotReadyForBilling(table_number));
            }

            let order_repo = SqliteOrderRepository::new(conn);
            let order = order_repo
                .find_open_order_for_table(table.id)?
                .filter(|order| order.status == OrderStatus::Served)
                .ok_or(ServiceError::NotReadyForBilling(table_number))?;
            let details = order_repo
                .get_order_details(order.id)?
                .ok_or_else(|| ServiceError::not_found("order", order.id))?;

            let invoice_repo = SqliteInvoiceRepository::new(conn);
            // The number's day and `created_at` come from the same instant.
            let now = now_epoch_ms();
            let day = utc_day(now);
            let sequence = invoice_repo.count_with_prefix(&invoice_number_prefix(day))? + 1;
            let invoice = Invoice {
                id: Uuid::new_v4(),
                invoice_number: format_invoice_number(day, sequence),
                table_id: table.id,
                order_id: order.id,
                total_amount_minor: details.total_minor()?,
                payment_method,
                created_by: me.id,
                created_at: now,
            };
            invoice_repo.create_invoice(&invoice)?;
            let invoice = invoice_repo
                .get_invoice(invoice.id)?
                .ok_or_else(|| ServiceError::not_found("invoice", invoice.id))?;
            journal.inserted(tables::INVOICES, invoice.id, &invoice)?;

            order_repo.update_order_status(order.id, OrderStatus::Billed)?;
            let billed = order_repo
                .get_order(order.id)?
                .ok_or_else(|| ServiceError::not_found("order", order.id))?;
            journal.updated(tables::ORDERS, order.id, &order, &billed)?;

            set_table_status(conn, journal, &table, TableStatus::Free, None)?;

            let entry = AuditEntry::by(me, "invoice_created", "invoice", Some(invoice.id))
                .with_details(json!({
                    "invoice_number": invoice.invoice_number,
                    "table_number": table_number,
                    "amount_minor": invoice.total_amount_minor,
                    "payment_method": payment_method.as_str(),
                }));
            SqliteAuditRepository::new(conn).append(&entry)?;
            Ok(invoice)
        })?;

        info!(
            "event=table_bill module=service status=ok table_number={} payment_method={} amount_minor={}",
            table_number,
            payment_method.as_str(),
            invoice.total_amount_minor
        );
        Ok(invoice)
    }

    /// Full menu including unavailable items.
    pub fn list_menu(&self) -> ServiceResult<Vec<MenuItem>> {
        self.session.require(Permission::ManageMenu)?;
        Ok(SqliteMenuRepository::new(self.conn).list_menu(&MenuQuery::default())?)
    }

    /// Creates a dish, or updates the dish with the same name.
    pub fn upsert_menu_item(&self, item: &MenuItem) -> ServiceResult<MenuItem> {
        self.session.require(Permission::ManageMenu)?;
        let me = &self.session.staff;

        write_unit(self.conn, self.feed, |conn, journal| {
            let repo = SqliteMenuRepository::new(conn);
            let existing = repo.find_by_name(&item.name)?;
            let id = repo.upsert_menu_item(item)?;
            let stored = repo
                .get_menu_item(id)?
                .ok_or_else(|| ServiceError::not_found("menu item", id))?;
            match &existing {
                Some(old) => journal.updated(tables::MENU_ITEMS, id, old, &stored)?,
                None => journal.inserted(tables::MENU_ITEMS, id, &stored)?,
            }

            let action = if existing.is_some() {
                "menu_item_updated"
            } else {
                "menu_item_created"
            };
            let entry = AuditEntry::by(me, action, "menu_item", Some(id)).with_details(json!({
                "name": stored.name,
                "category": stored.category,
                "price_minor": stored.price_minor,
            }));
            SqliteAuditRepository::new(conn).append(&entry)?;
            Ok(stored)
        })
    }

    /// Toggles whether servers can order a dish.
    pub fn set_menu_availability(
        &self,
        menu_item_id: MenuItemId,
        is_available: bool,
    ) -> ServiceResult<MenuItem> {
        self.session.require(Permission::ManageMenu)?;
        let me = &self.session.staff;

        write_unit(self.conn, self.feed, |conn, journal| {
            let repo = SqliteMenuRepository::new(conn);
            let old = repo
                .get_menu_item(menu_item_id)?
                .ok_or_else(|| ServiceError::not_found("menu item", menu_item_id))?;
            repo.set_availability(menu_item_id, is_available)?;
            let stored = repo
                .get_menu_item(menu_item_id)?
                .ok_or_else(|| ServiceError::not_found("menu item", menu_item_id))?;
            journal.updated(tables::MENU_ITEMS, menu_item_id, &old, &stored)?;

            let entry = AuditEntry::by(me, "menu_availability_changed", "menu_item", Some(menu_item_id))
                .with_details(json!({ "name": stored.name, "is_available": is_available }));
            SqliteAuditRepository::new(conn).append(&entry)?;
            Ok(stored)
        })
    }

    pub fn list_staff(&self) -> ServiceResult<Vec<StaffMember>> {
        self.session.require(Permission::ViewStaff)?;
        Ok(SqliteStaffRepository::new(self.conn).list_staff()?)
    }

    /// Activates or deactivates an account. Deactivation ends its sessions on next use.
    pub fn set_staff_active(&self, staff_id: StaffId, is_active: bool) -> ServiceResult<StaffMember> {
        self.session.require(Permission::ManageStaff)?;
        let me = &self.session.staff;

        write_unit(self.conn, self.feed, |conn, journal| {
            let repo = SqliteStaffRepository::new(conn);
            let old = repo
                .get_staff(staff_id)?
                .ok_or_else(|| ServiceError::not_found("staff", staff_id))?;
            repo.set_active(staff_id, is_active)?;
            let stored = repo
                .get_staff(staff_id)?
                .ok_or_else(|| ServiceError::not_found("staff", staff_id))?;
            journal.updated(tables::STAFF, staff_id, &old, &stored)?;

            let entry = AuditEntry::by(me, "staff_active_changed", "staff", Some(staff_id))
                .with_details(json!({ "is_active": is_active }));
            SqliteAuditRepository::new(conn).append(&entry)?;
            Ok(stored)
        })
    }

    /// Every invoice, newest first.
    pub fn list_invoices(&self) -> ServiceResult<Vec<Invoice>> {
        self.session.require(Permission::ViewReports)?;
        Ok(SqliteInvoiceRepository::new(self.conn).list_invoices()?)
    }

    pub fn audit_log(&self, limit: u32) -> ServiceResult<Vec<AuditEntry>> {
        self.session.require(Permission::ViewAuditLog)?;
        Ok(SqliteAuditRepository::new(self.conn).list_recent(limit)?)
    }

    /// Sales figures for the UTC day `day` plus all-time totals.
    pub fn sales_report(&self, day: NaiveDate) -> ServiceResult<SalesReport> {
        self.session.require(Permission::ViewReports)?;
        let invoices = SqliteInvoiceRepository::new(self.conn).list_invoices()?;
        let ready = SqliteTableRepository::new(self.conn)
            .list_by_status(TableStatus::Served)?
            .len() as u64;
        Ok(SalesReport::compute(&invoices, day, ready)?)
    }
}
