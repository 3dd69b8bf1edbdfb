//! OpenAPI schemas for response envelopes that are not domain types.
//!
//! `pagination::Page<T>` lives in a framework-free crate, so each concrete
//! page is described here for the generated document only.

use utoipa::ToSchema;

use crate::domain::User;
use crate::domain::billing::{Invoice, PaymentTransaction};
use crate::domain::shop::UserPurchase;

macro_rules! page_schema {
    ($name:ident, $item:ty, $doc:literal) => {
        #[doc = $doc]
        #[derive(ToSchema)]
        #[schema(rename_all = "camelCase")]
        #[expect(dead_code, reason = "Used only for OpenAPI schema generation via utoipa")]
        pub struct $name {
            data: Vec<$item>,
            /// Opaque cursor for the next page; absent on the last page.
            next_cursor: Option<String>,
        }
    };
}

page_schema!(UserPage, User, "A page of users.");
page_schema!(PurchasePage, UserPurchase, "A page of shop purchases.");
page_schema!(TransactionPage, PaymentTransaction, "A page of payment transactions.");
page_schema!(InvoicePage, Invoice, "A page of invoices.");
