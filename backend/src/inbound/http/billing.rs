//! Subscription and payment handlers.
//!
//! Learners browse plans, check promo codes and open checkouts. Confirmation,
//! failure and refunds come from administrators acting for the payment
//! provider.
//!
//! ```text
//! GET    /api/v1/billing/plans
//! POST   /api/v1/billing/promo-codes/validate
//! POST   /api/v1/billing/checkout
//! GET    /api/v1/billing/transactions?status=&limit=&cursor=
//! GET    /api/v1/billing/transactions/{id}
//! GET    /api/v1/billing/invoices?limit=&cursor=
//! GET    /api/v1/billing/invoices/{transactionId}
//! GET    /api/v1/admin/billing/settings                PUT
//! GET    /api/v1/admin/billing/plans                   POST
//! GET    /api/v1/admin/billing/plans/{id}              PUT, DELETE
//! GET    /api/v1/admin/billing/promo-codes             POST
//! GET    /api/v1/admin/billing/promo-codes/{id}        PUT, DELETE
//! GET    /api/v1/admin/billing/transactions?userId=&status=&limit=&cursor=
//! GET    /api/v1/admin/billing/transactions/{id}
//! POST   /api/v1/admin/billing/transactions/{id}/confirm
//! POST   /api/v1/admin/billing/transactions/{id}/fail
//! GET    /api/v1/admin/billing/transactions/{id}/refunds   POST
//! GET    /api/v1/admin/billing/invoices?userId=&limit=&cursor=
//! GET    /api/v1/admin/billing/invoices/{transactionId}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::billing::{
    CheckoutRequest, ConfirmRequest, Invoice, PaymentSettings, PaymentSettingsUpdate,
    PaymentTransaction, PromoCode, PromoCodeDraft, Quote, Refund, RefundRequest,
    SubscriptionPlan, SubscriptionPlanDraft, TransactionStatus,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthContext;
use crate::inbound::http::pagination::PageParams;
use crate::inbound::http::schemas::{InvoicePage, TransactionPage};
use crate::inbound::http::state::HttpState;

/// Body of a promo code check.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromoValidationRequest {
    #[schema(example = "SPRING25")]
    pub code: String,
    pub plan_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    pub status: Option<TransactionStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFilter {
    pub user_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/billing/plans",
    responses(
        (status = 200, description = "Plans on sale", body = [SubscriptionPlan]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["billing"],
    operation_id = "listPlans"
)]
#[get("/billing/plans")]
pub async fn list_plans(
    state: web::Data<HttpState>,
    _auth: AuthContext,
) -> ApiResult<HttpResponse> {
    let plans = state.billing_query.list_plans(false).await?;
    Ok(HttpResponse::Ok().json(plans))
}

/// Price a plan with a promo code applied.
#[utoipa::path(
    post,
    path = "/api/v1/billing/promo-codes/validate",
    request_body = PromoValidationRequest,
    responses(
        (status = 200, description = "Quote with the discount applied", body = Quote),
        (status = 400, description = "Code not redeemable", body = Error),
        (status = 404, description = "Unknown code or plan", body = Error)
    ),
    tags = ["billing"],
    operation_id = "validatePromoCode"
)]
#[post("/billing/promo-codes/validate")]
pub async fn validate_promo_code(
    state: web::Data<HttpState>,
    _auth: AuthContext,
    payload: web::Json<PromoValidationRequest>,
) -> ApiResult<HttpResponse> {
    let PromoValidationRequest { code, plan_id } = payload.into_inner();
    let quote = state.billing_query.validate_promo_code(code, plan_id).await?;
    Ok(HttpResponse::Ok().json(quote))
}

/// Open a pending transaction for a plan.
#[utoipa::path(
    post,
    path = "/api/v1/billing/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Pending transaction", body = PaymentTransaction),
        (status = 400, description = "Promo code not redeemable", body = Error),
        (status = 404, description = "Unknown plan", body = Error),
        (status = 503, description = "Payments disabled", body = Error)
    ),
    tags = ["billing"],
    operation_id = "checkout"
)]
#[post("/billing/checkout")]
pub async fn checkout(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<CheckoutRequest>,
) -> ApiResult<HttpResponse> {
    let transaction = state
        .payments
        .checkout(auth.user(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(transaction))
}

#[utoipa::path(
    get,
    path = "/api/v1/billing/transactions",
    params(
        ("status" = Option<TransactionStatus>, Query, description = "Only transactions in this state"),
        ("limit" = Option<usize>, Query, description = "Page size, default 20, max 100"),
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page")
    ),
    responses(
        (status = 200, description = "Caller's transactions", body = TransactionPage),
        (status = 400, description = "Invalid query", body = Error)
    ),
    tags = ["billing"],
    operation_id = "listMyTransactions"
)]
#[get("/billing/transactions")]
pub async fn list_my_transactions(
    state: web::Data<HttpState>,
    auth: AuthContext,
    filter: web::Query<StatusFilter>,
    page: web::Query<PageParams>,
) -> ApiResult<HttpResponse> {
    let page = page.page_request()?;
    let transactions = state
        .billing_query
        .list_transactions(Some(auth.user().id), filter.status, page)
        .await?;
    Ok(HttpResponse::Ok().json(transactions))
}

#[utoipa::path(
    get,
    path = "/api/v1/billing/transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction", body = PaymentTransaction),
        (status = 404, description = "Unknown transaction", body = Error)
    ),
    tags = ["billing"],
    operation_id = "getMyTransaction"
)]
#[get("/billing/transactions/{id}")]
pub async fn get_my_transaction(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let transaction = state
        .billing_query
        .get_transaction(auth.user(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(transaction))
}

#[utoipa::path(
    get,
    path = "/api/v1/billing/invoices",
    params(
        ("limit" = Option<usize>, Query, description = "Page size, default 20, max 100"),
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page")
    ),
    responses(
        (status = 200, description = "Caller's invoices", body = InvoicePage),
        (status = 400, description = "Invalid query", body = Error)
    ),
    tags = ["billing"],
    operation_id = "listMyInvoices"
)]
#[get("/billing/invoices")]
pub async fn list_my_invoices(
    state: web::Data<HttpState>,
    auth: AuthContext,
    page: web::Query<PageParams>,
) -> ApiResult<HttpResponse> {
    let page = page.page_request()?;
    let invoices = state
        .billing_query
        .list_invoices(Some(auth.user().id), page)
        .await?;
    Ok(HttpResponse::Ok().json(invoices))
}

#[utoipa::path(
    get,
    path = "/api/v1/billing/invoices/{transactionId}",
    params(("transactionId" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Invoice", body = Invoice),
        (status = 404, description = "No invoice for this transaction", body = Error)
    ),
    tags = ["billing"],
    operation_id = "getMyInvoice"
)]
#[get("/billing/invoices/{transaction_id}")]
pub async fn get_my_invoice(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let invoice = state
        .billing_query
        .get_invoice(auth.user(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(invoice))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/billing/settings",
    responses(
        (status = 200, description = "Payment settings", body = PaymentSettings),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "getPaymentSettings"
)]
#[get("/admin/billing/settings")]
pub async fn get_settings(
    state: web::Data<HttpState>,
    auth: AuthContext,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let settings = state.billing_query.settings().await?;
    Ok(HttpResponse::Ok().json(settings))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/billing/settings",
    request_body = PaymentSettingsUpdate,
    responses(
        (status = 200, description = "Updated settings", body = PaymentSettings),
        (status = 400, description = "Invalid settings", body = Error),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "updatePaymentSettings"
)]
#[put("/admin/billing/settings")]
pub async fn update_settings(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<PaymentSettingsUpdate>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let settings = state
        .billing_admin
        .update_settings(payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(settings))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/billing/plans",
    responses(
        (status = 200, description = "All plans", body = [SubscriptionPlan]),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminListPlans"
)]
#[get("/admin/billing/plans")]
pub async fn admin_list_plans(
    state: web::Data<HttpState>,
    auth: AuthContext,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let plans = state.billing_query.list_plans(true).await?;
    Ok(HttpResponse::Ok().json(plans))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/billing/plans",
    request_body = SubscriptionPlanDraft,
    responses(
        (status = 201, description = "Created", body = SubscriptionPlan),
        (status = 400, description = "Invalid plan", body = Error),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "createPlan"
)]
#[post("/admin/billing/plans")]
pub async fn create_plan(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<SubscriptionPlanDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let plan = state.billing_admin.create_plan(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(plan))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/billing/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan id")),
    responses(
        (status = 200, description = "Plan", body = SubscriptionPlan),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown plan", body = Error)
    ),
    tags = ["admin"],
    operation_id = "getPlan"
)]
#[get("/admin/billing/plans/{id}")]
pub async fn get_plan(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let plan = state.billing_query.get_plan(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(plan))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/billing/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan id")),
    request_body = SubscriptionPlanDraft,
    responses(
        (status = 200, description = "Updated", body = SubscriptionPlan),
        (status = 400, description = "Invalid plan", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown plan", body = Error)
    ),
    tags = ["admin"],
    operation_id = "updatePlan"
)]
#[put("/admin/billing/plans/{id}")]
pub async fn update_plan(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<SubscriptionPlanDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let plan = state
        .billing_admin
        .update_plan(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(plan))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/billing/plans/{id}",
    params(("id" = Uuid, Path, description = "Plan id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown plan", body = Error),
        (status = 409, description = "Plan has transactions", body = Error)
    ),
    tags = ["admin"],
    operation_id = "deletePlan"
)]
#[delete("/admin/billing/plans/{id}")]
pub async fn delete_plan(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    state.billing_admin.delete_plan(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/billing/promo-codes",
    responses(
        (status = 200, description = "Promo codes", body = [PromoCode]),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "listPromoCodes"
)]
#[get("/admin/billing/promo-codes")]
pub async fn list_promo_codes(
    state: web::Data<HttpState>,
    auth: AuthContext,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let codes = state.billing_query.list_promo_codes().await?;
    Ok(HttpResponse::Ok().json(codes))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/billing/promo-codes",
    request_body = PromoCodeDraft,
    responses(
        (status = 201, description = "Created", body = PromoCode),
        (status = 400, description = "Invalid promo code", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 409, description = "Code already exists", body = Error)
    ),
    tags = ["admin"],
    operation_id = "createPromoCode"
)]
#[post("/admin/billing/promo-codes")]
pub async fn create_promo_code(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<PromoCodeDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let code = state
        .billing_admin
        .create_promo_code(payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(code))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/billing/promo-codes/{id}",
    params(("id" = Uuid, Path, description = "Promo code id")),
    responses(
        (status = 200, description = "Promo code", body = PromoCode),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown promo code", body = Error)
    ),
    tags = ["admin"],
    operation_id = "getPromoCode"
)]
#[get("/admin/billing/promo-codes/{id}")]
pub async fn get_promo_code(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let code = state.billing_query.get_promo_code(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(code))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/billing/promo-codes/{id}",
    params(("id" = Uuid, Path, description = "Promo code id")),
    request_body = PromoCodeDraft,
    responses(
        (status = 200, description = "Updated", body = PromoCode),
        (status = 400, description = "Invalid promo code", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown promo code", body = Error),
        (status = 409, description = "Code already exists", body = Error)
    ),
    tags = ["admin"],
    operation_id = "updatePromoCode"
)]
#[put("/admin/billing/promo-codes/{id}")]
pub async fn update_promo_code(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<PromoCodeDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let code = state
        .billing_admin
        .update_promo_code(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(code))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/billing/promo-codes/{id}",
    params(("id" = Uuid, Path, description = "Promo code id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown promo code", body = Error)
    ),
    tags = ["admin"],
    operation_id = "deletePromoCode"
)]
#[delete("/admin/billing/promo-codes/{id}")]
pub async fn delete_promo_code(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    state.billing_admin.delete_promo_code(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/billing/transactions",
    params(
        ("userId" = Option<Uuid>, Query, description = "Only transactions of this user"),
        ("status" = Option<TransactionStatus>, Query, description = "Only transactions in this state"),
        ("limit" = Option<usize>, Query, description = "Page size, default 20, max 100"),
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page")
    ),
    responses(
        (status = 200, description = "Transactions", body = TransactionPage),
        (status = 400, description = "Invalid query", body = Error),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminListTransactions"
)]
#[get("/admin/billing/transactions")]
pub async fn admin_list_transactions(
    state: web::Data<HttpState>,
    auth: AuthContext,
    customer: web::Query<CustomerFilter>,
    status: web::Query<StatusFilter>,
    page: web::Query<PageParams>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let page = page.page_request()?;
    let transactions = state
        .billing_query
        .list_transactions(customer.user_id, status.status, page)
        .await?;
    Ok(HttpResponse::Ok().json(transactions))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/billing/transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction", body = PaymentTransaction),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown transaction", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminGetTransaction"
)]
#[get("/admin/billing/transactions/{id}")]
pub async fn admin_get_transaction(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let admin = auth.require_admin()?;
    let transaction = state
        .billing_query
        .get_transaction(admin, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(transaction))
}

/// Record a provider confirmation; issues the invoice and extends the
/// subscription.
#[utoipa::path(
    post,
    path = "/api/v1/admin/billing/transactions/{id}/confirm",
    params(("id" = Uuid, Path, description = "Transaction id")),
    request_body = ConfirmRequest,
    responses(
        (status = 200, description = "Settled transaction", body = PaymentTransaction),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown transaction", body = Error),
        (status = 409, description = "Transaction is not pending", body = Error)
    ),
    tags = ["admin"],
    operation_id = "confirmTransaction"
)]
#[post("/admin/billing/transactions/{id}/confirm")]
pub async fn confirm_transaction(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<ConfirmRequest>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let transaction = state
        .payments
        .confirm(path.into_inner(), payload.into_inner().provider_reference)
        .await?;
    Ok(HttpResponse::Ok().json(transaction))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/billing/transactions/{id}/fail",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Failed transaction", body = PaymentTransaction),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown transaction", body = Error),
        (status = 409, description = "Transaction is not pending", body = Error)
    ),
    tags = ["admin"],
    operation_id = "failTransaction"
)]
#[post("/admin/billing/transactions/{id}/fail")]
pub async fn fail_transaction(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let transaction = state.payments.fail(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/billing/transactions/{id}/refunds",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Refunds, oldest first", body = [Refund]),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown transaction", body = Error)
    ),
    tags = ["admin"],
    operation_id = "listRefunds"
)]
#[get("/admin/billing/transactions/{id}/refunds")]
pub async fn list_refunds(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let refunds = state.billing_query.list_refunds(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(refunds))
}

/// Refund part or all of a settled payment.
#[utoipa::path(
    post,
    path = "/api/v1/admin/billing/transactions/{id}/refunds",
    params(("id" = Uuid, Path, description = "Transaction id")),
    request_body = RefundRequest,
    responses(
        (status = 200, description = "Transaction after the refund", body = PaymentTransaction),
        (status = 400, description = "Amount exceeds the refundable balance", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown transaction", body = Error),
        (status = 409, description = "Transaction cannot be refunded", body = Error)
    ),
    tags = ["admin"],
    operation_id = "refundTransaction"
)]
#[post("/admin/billing/transactions/{id}/refunds")]
pub async fn refund_transaction(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<RefundRequest>,
) -> ApiResult<HttpResponse> {
    let admin = auth.require_admin()?;
    let transaction = state
        .payments
        .refund(admin, path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(transaction))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/billing/invoices",
    params(
        ("userId" = Option<Uuid>, Query, description = "Only invoices of this user"),
        ("limit" = Option<usize>, Query, description = "Page size, default 20, max 100"),
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page")
    ),
    responses(
        (status = 200, description = "Invoices", body = InvoicePage),
        (status = 400, description = "Invalid query", body = Error),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminListInvoices"
)]
#[get("/admin/billing/invoices")]
pub async fn admin_list_invoices(
    state: web::Data<HttpState>,
    auth: AuthContext,
    customer: web::Query<CustomerFilter>,
    page: web::Query<PageParams>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let page = page.page_request()?;
    let invoices = state
        .billing_query
        .list_invoices(customer.user_id, page)
        .await?;
    Ok(HttpResponse::Ok().json(invoices))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/billing/invoices/{transactionId}",
    params(("transactionId" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Invoice", body = Invoice),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "No invoice for this transaction", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminGetInvoice"
)]
#[get("/admin/billing/invoices/{transaction_id}")]
pub async fn admin_get_invoice(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let admin = auth.require_admin()?;
    let invoice = state
        .billing_query
        .get_invoice(admin, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(invoice))
}

/// Register the billing routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_plans)
        .service(validate_promo_code)
        .service(checkout)
        .service(list_my_transactions)
        .service(get_my_transaction)
        .service(list_my_invoices)
        .service(get_my_invoice)
        .service(get_settings)
        .service(update_settings)
        .service(admin_list_plans)
        .service(create_plan)
        .service(get_plan)
        .service(update_plan)
        .service(delete_plan)
        .service(list_promo_codes)
        .service(create_promo_code)
        .service(get_promo_code)
        .service(update_promo_code)
        .service(delete_promo_code)
        .service(admin_list_transactions)
        .service(admin_get_transaction)
        .service(confirm_transaction)
        .service(fail_transaction)
        .service(list_refunds)
        .service(refund_transaction)
        .service(admin_list_invoices)
        .service(admin_get_invoice);
}

#[cfg(test)]
#[path = "billing_tests.rs"]
mod tests;
