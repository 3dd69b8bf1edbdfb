//! Invoices derived from settled transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{PaymentTransaction, TransactionStatus};

/// Format `{PREFIX}-{YYYY}-{NNNNNN}`.
///
/// # Examples
/// ```
/// use lingo::domain::billing::format_invoice_number;
///
/// assert_eq!(format_invoice_number("INV", 2026, 42), "INV-2026-000042");
/// ```
pub fn format_invoice_number(prefix: &str, year: i32, sequence: u64) -> String {
    format!("{prefix}-{year:04}-{sequence:06}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: u32,
    pub unit_amount: u64,
    pub amount: u64,
}

/// Read-only invoice view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[schema(example = "INV-2026-000042")]
    pub number: String,
    pub transaction_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub company_name: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub lines: Vec<InvoiceLine>,
    pub currency: String,
    pub subtotal: u64,
    pub discount: u64,
    pub tax: u64,
    pub total: u64,
    pub refunded: u64,
    pub status: TransactionStatus,
}

impl Invoice {
    /// Invoice for a paid transaction; `None` while pending or after failure.
    pub fn from_transaction(
        transaction: &PaymentTransaction,
        company_name: &str,
    ) -> Option<Self> {
        if !transaction.status.is_invoiced() {
            return None;
        }
        let number = transaction.invoice_number.clone()?;
        let issued_at = transaction.settled_at.unwrap_or(transaction.created_at);
        let mut lines = vec![InvoiceLine {
            description: format!("{} subscription", transaction.plan_name),
            quantity: 1,
            unit_amount: transaction.subtotal,
            amount: transaction.subtotal,
        }];
        if let Some(code) = &transaction.promo_code
            && transaction.discount > 0
        {
            lines.push(InvoiceLine {
                description: format!("Promo code {code}"),
                quantity: 1,
                unit_amount: transaction.discount,
                amount: transaction.discount,
            });
        }
        Some(Self {
            number,
            transaction_id: transaction.id,
            issued_at,
            company_name: company_name.to_owned(),
            customer_id: transaction.user_id,
            customer_name: transaction.customer_name.clone(),
            customer_email: transaction.customer_email.clone(),
            lines,
            currency: transaction.currency.clone(),
            subtotal: transaction.subtotal,
            discount: transaction.discount,
            tax: transaction.tax,
            total: transaction.total,
            refunded: transaction.refunded,
            status: transaction.status,
        })
    }
}
