//! Invoice repository.
//!
//! # Invariants
//! - One invoice per order; `invoice_number` is unique.

use super::{map_constraint, parse_enum, parse_uuid, RepoResult};
use crate::db::now_epoch_ms;
use crate::model::invoice::{Invoice, InvoiceId, PaymentMethod};
use crate::model::order::OrderId;
use crate::model::ValidationError;
use rusqlite::{params, Connection, Row};

const INVOICE_SELECT_SQL: &str = "SELECT
    id,
    invoice_number,
    table_id,
    order_id,
    total_amount_minor,
    payment_method,
    created_by,
    created_at
FROM invoices";

pub trait InvoiceRepository {
    /// Stores `invoice.created_at` as given; `0` means now.
    fn create_invoice(&self, invoice: &Invoice) -> RepoResult<InvoiceId>;
    fn get_invoice(&self, id: InvoiceId) -> RepoResult<Option<Invoice>>;
    fn find_by_order(&self, order_id: OrderId) -> RepoResult<Option<Invoice>>;
    /// Lists invoices newest first.
    fn list_invoices(&self) -> RepoResult<Vec<Invoice>>;
    /// Number of invoices whose number starts with `prefix`.
    fn count_with_prefix(&self, prefix: &str) -> RepoResult<u32>;
}

pub struct SqliteInvoiceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteInvoiceRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_one(&self, sql: &str, key: String) -> RepoResult<Option<Invoice>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([key])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_invoice_row(row)?));
        }
        Ok(None)
    }
}

impl InvoiceRepository for SqliteInvoiceRepository<'_> {
    fn create_invoice(&self, invoice: &Invoice) -> RepoResult<InvoiceId> {
        if invoice.total_amount_minor < 0 {
            return Err(ValidationError::NegativeAmount(invoice.total_amount_minor).into());
        }
        let created_at = if invoice.created_at > 0 {
            invoice.created_at
        } else {
            now_epoch_ms()
        };

        self.conn
            .execute(
                "INSERT INTO invoices (
                    id,
                    invoice_number,
                    table_id,
                    order_id,
                    total_amount_minor,
                    payment_method,
                    created_by,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    invoice.id.to_string(),
                    invoice.invoice_number.as_str(),
                    invoice.table_id.to_string(),
                    invoice.order_id.to_string(),
                    invoice.total_amount_minor,
                    invoice.payment_method.as_str(),
                    invoice.created_by.to_string(),
                    created_at,
                ],
            )
            .map_err(|err| {
                map_constraint(err, format!("order {} is already invoiced", invoice.order_id))
            })?;
        Ok(invoice.id)
    }

    fn get_invoice(&self, id: InvoiceId) -> RepoResult<Option<Invoice>> {
        self.query_one(&format!("{INVOICE_SELECT_SQL} WHERE id = ?1;"), id.to_string())
    }

    fn find_by_order(&self, order_id: OrderId) -> RepoResult<Option<Invoice>> {
        self.query_one(
            &format!("{INVOICE_SELECT_SQL} WHERE order_id = ?1;"),
            order_id.to_string(),
        )
    }

    fn list_invoices(&self) -> RepoResult<Vec<Invoice>> {
        let mut stmt = self.conn.prepare(&format!(
            "{INVOICE_SELECT_SQL} ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut invoices = Vec::new();
        while let Some(row) = rows.next()? {
            invoices.push(parse_invoice_row(row)?);
        }
        Ok(invoices)
    }

    fn count_with_prefix(&self, prefix: &str) -> RepoResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM invoices WHERE substr(invoice_number, 1, length(?1)) = ?1;",
            [prefix],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn parse_invoice_row(row: &Row<'_>) -> RepoResult<Invoice> {
    let id: String = row.get("id")?;
    let table_id: String = row.get("table_id")?;
    let order_id: String = row.get("order_id")?;
    let payment_method: String = row.get("payment_method")?;
    let created_by: String = row.get("created_by")?;

    Ok(Invoice {
        id: parse_uuid(&id, "invoices.id")?,
        invoice_number: row.get("invoice_number")?,
        table_id: parse_uuid(&table_id, "invoices.table_id")?,
        order_id: parse_uuid(&order_id, "invoices.order_id")?,
        total_amount_minor: row.get("total_amount_minor")?,
        payment_method: parse_enum(
            &payment_method,
            "invoices.payment_method",
            PaymentMethod::parse,
        )?,
        created_by: parse_uuid(&created_by, "invoices.created_by")?,
        created_at: row.get("created_at")?,
    })
}
