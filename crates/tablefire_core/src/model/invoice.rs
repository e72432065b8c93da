//! Invoices issued when a served table is billed.

use super::order::OrderId;
use super::staff::StaffId;
use super::table::TableId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type InvoiceId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Upi,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 2] = [PaymentMethod::Cash, PaymentMethod::Upi];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Upi => "upi",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cash" => Some(Self::Cash),
            "upi" => Some(Self::Upi),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    /// Human-facing number, `INV-YYYYMMDD-NNNN`.
    pub invoice_number: String,
    pub table_id: TableId,
    pub order_id: OrderId,
    pub total_amount_minor: i64,
    pub payment_method: PaymentMethod,
    pub created_by: StaffId,
    pub created_at: i64,
}

/// Formats the per-day invoice number, e.g. `INV-20261019-0007`.
pub fn format_invoice_number(day: NaiveDate, sequence: u32) -> String {
    format!("INV-{}-{sequence:04}", day.format("%Y%m%d"))
}

/// Prefix shared by every invoice number issued on `day`.
pub fn invoice_number_prefix(day: NaiveDate) -> String {
    format!("INV-{}-", day.format("%Y%m%d"))
}

/// UTC calendar day of an epoch-millisecond timestamp.
pub fn utc_day(epoch_ms: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .unwrap_or_default()
        .date_naive()
}

#[cfg(test)]
mod tests {
    use super::{format_invoice_number, utc_day, PaymentMethod};
    use chrono::NaiveDate;

    #[test]
    fn invoice_number_is_zero_padded_per_day() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");
        assert_eq!(format_invoice_number(day, 7), "INV-20261019-0007");
    }

    #[test]
    fn utc_day_truncates_epoch_ms() {
        // 2026-10-19T23:59:59.999Z
        assert_eq!(
            utc_day(1_792_454_399_999),
            NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date")
        );
    }

    #[test]
    fn payment_method_values_are_stable() {
        for method in PaymentMethod::ALL {
            assert_eq!(PaymentMethod::parse(method.as_str()), Some(method));
        }
        assert_eq!(PaymentMethod::parse("card"), None);
    }
}
