//! Sales report aggregated from issued invoices.

use super::invoice::{utc_day, Invoice, PaymentMethod};
use super::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Count and amount for one payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentBreakdown {
    pub method: PaymentMethod,
    pub invoice_count: u64,
    pub amount_minor: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReport {
    pub day: NaiveDate,
    pub today_sales_minor: i64,
    pub today_invoice_count: u64,
    pub total_sales_minor: i64,
    pub total_invoice_count: u64,
    /// Integer mean of invoice totals; zero when nothing was billed.
    pub average_order_minor: i64,
    /// One entry per payment method, in `PaymentMethod::ALL` order.
    pub by_payment_method: Vec<PaymentBreakdown>,
    pub tables_ready_for_billing: u64,
}

impl SalesReport {
    /// Aggregates `invoices`; `day` is compared against each invoice's UTC day.
    pub fn compute(
        invoices: &[Invoice],
        day: NaiveDate,
        tables_ready_for_billing: u64,
    ) -> Result<Self, ValidationError> {
        let mut report = Self {
            day,
            today_sales_minor: 0,
            today_invoice_count: 0,
            total_sales_minor: 0,
            total_invoice_count: 0,
            average_order_minor: 0,
            by_payment_method: PaymentMethod::ALL
                .iter()
                .map(|method| PaymentBreakdown {
                    method: *method,
                    invoice_count: 0,
                    amount_minor: 0,
                })
                .collect(),
            tables_ready_for_billing,
        };

        for invoice in invoices {
            report.total_sales_minor = add_amount(report.total_sales_minor, invoice)?;
            report.total_invoice_count += 1;

            if utc_day(invoice.created_at) == day {
                report.today_sales_minor = add_amount(report.today_sales_minor, invoice)?;
                report.today_invoice_count += 1;
            }

            if let Some(entry) = report
                .by_payment_method
                .iter_mut()
                .find(|entry| entry.method == invoice.payment_method)
            {
                entry.invoice_count += 1;
                entry.amount_minor = add_amount(entry.amount_minor, invoice)?;
            }
        }

        if report.total_invoice_count > 0 {
            report.average_order_minor =
                report.total_sales_minor / report.total_invoice_count as i64;
        }

        Ok(report)
    }
}

fn add_amount(total: i64, invoice: &Invoice) -> Result<i64, ValidationError> {
    total
        .checked_add(invoice.total_amount_minor)
        .ok_or(ValidationError::AmountOverflow)
}
