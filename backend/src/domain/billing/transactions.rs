//! Payment transactions and refunds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Quote;
use crate::domain::Error;
use crate::domain::ports::Entity;
use crate::domain::user::User;

/// Lifecycle of a payment.
///
/// `pending` moves to `succeeded` or `failed`. Succeeded payments can be
/// refunded in parts until they reach `refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Succeeded,
    Failed,
    PartiallyRefunded,
    Refunded,
}

impl TransactionStatus {
    /// Whether an invoice exists for this status.
    pub fn is_invoiced(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::PartiallyRefunded | Self::Refunded
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::PartiallyRefunded => "partially_refunded",
            Self::Refunded => "refunded",
        }
    }
}

fn invalid_transition(from: TransactionStatus, action: &str) -> Error {
    Error::conflict(format!("cannot {action} a {} transaction", from.as_str())).with_details(
        json!({ "code": "invalid_transition", "from": from.as_str(), "transition": action }),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub plan_id: Uuid,
    pub plan_name: String,
    pub currency: String,
    pub subtotal: u64,
    pub discount: u64,
    pub tax_rate_bps: u32,
    pub tax: u64,
    pub total: u64,
    /// Sum of all refunds so far.
    pub refunded: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<DateTime<Utc>>,
}

impl Entity for PaymentTransaction {
    const COLLECTION: &'static str = "payment_transactions";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl PaymentTransaction {
    /// Pending transaction for `quote`.
    pub fn pending(user: &User, quote: Quote, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user.id,
            customer_name: user.display_name.to_string(),
            customer_email: user.email.clone(),
            plan_id: quote.plan_id,
            plan_name: quote.plan_name,
            currency: quote.currency,
            subtotal: quote.subtotal,
            discount: quote.discount,
            tax_rate_bps: quote.tax_rate_bps,
            tax: quote.tax,
            total: quote.total,
            refunded: 0,
            promo_code: quote.promo_code,
            status: TransactionStatus::Pending,
            provider_reference: None,
            invoice_number: None,
            created_at: now,
            settled_at: None,
        }
    }

    /// Fail unless the transaction is still pending.
    pub fn ensure_pending(&self, action: &str) -> Result<(), Error> {
        if self.status == TransactionStatus::Pending {
            Ok(())
        } else {
            Err(invalid_transition(self.status, action))
        }
    }

    /// Mark a pending transaction paid.
    pub fn confirm(
        &mut self,
        provider_reference: String,
        invoice_number: String,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.ensure_pending("confirm")?;
        self.status = TransactionStatus::Succeeded;
        self.provider_reference = Some(provider_reference);
        self.invoice_number = Some(invoice_number);
        self.settled_at = Some(now);
        Ok(())
    }

    /// Mark a pending transaction failed.
    pub fn fail(&mut self, now: DateTime<Utc>) -> Result<(), Error> {
        self.ensure_pending("fail")?;
        self.status = TransactionStatus::Failed;
        self.settled_at = Some(now);
        Ok(())
    }

    /// Amount still available for refunds.
    pub fn refundable(&self) -> u64 {
        self.total.saturating_sub(self.refunded)
    }

    /// Net amount kept after refunds.
    pub fn net_revenue(&self) -> u64 {
        if self.status.is_invoiced() {
            self.refundable()
        } else {
            0
        }
    }

    /// Record a refund of `amount`. Returns whether the payment is now fully
    /// refunded.
    pub fn apply_refund(&mut self, amount: u64) -> Result<bool, Error> {
        if !matches!(
            self.status,
            TransactionStatus::Succeeded | TransactionStatus::PartiallyRefunded
        ) {
            return Err(invalid_transition(self.status, "refund"));
        }
        if amount == 0 {
            return Err(Error::invalid_field(
                "amount",
                "out_of_range",
                "refund amount must be positive",
            ));
        }
        let refundable = self.refundable();
        if amount > refundable {
            return Err(Error::invalid_field(
                "amount",
                "exceeds_refundable",
                format!("at most {refundable} can still be refunded"),
            ));
        }
        self.refunded += amount;
        let full = self.refunded == self.total;
        self.status = if full {
            TransactionStatus::Refunded
        } else {
            TransactionStatus::PartiallyRefunded
        };
        Ok(full)
    }
}

/// A refund issued by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Admin who issued the refund.
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Entity for Refund {
    const COLLECTION: &'static str = "refunds";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Learner checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub plan_id: Uuid,
    #[serde(default)]
    pub promo_code: Option<String>,
}

/// Payment provider confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    #[schema(example = "pi_3Nf9")]
    pub provider_reference: String,
}

/// Admin refund request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub amount: u64,
    #[serde(default)]
    pub reason: Option<String>,
}
