//! Subscription checkout, settlement, invoicing and refunds.

mod support;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use chrono::{DateTime, Months, Utc};
use rstest::rstest;
use serde_json::{Value, json};
use uuid::Uuid;

use support::{
    ADMIN_TOKEN, LEARNER_TOKEN, admin_create, call, fresh_state, get, id_of, init_app, post,
    term_start,
};

fn instant(value: &Value) -> DateTime<Utc> {
    serde_json::from_value(value.clone()).expect("RFC 3339 timestamp")
}

async fn monthly_plan_with_promo<S>(app: &S) -> Uuid
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<actix_web::body::BoxBody>,
            Error = actix_web::Error,
        >,
{
    let plan_id = admin_create(
        app,
        "/api/v1/admin/billing/plans",
        json!({
            "name": "Monthly",
            "price": 1000,
            "interval": "month",
            "features": ["Unlimited hearts"]
        }),
    )
    .await;
    admin_create(
        app,
        "/api/v1/admin/billing/promo-codes",
        json!({ "code": "spring20", "discount": { "type": "percent", "percent": 20 } }),
    )
    .await;
    plan_id
}

#[rstest]
#[actix_web::test]
async fn promo_codes_are_quoted_before_checkout() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let plan_id = monthly_plan_with_promo(&app).await;

    let (status, quote) = post(
        &app,
        "/api/v1/billing/promo-codes/validate",
        LEARNER_TOKEN,
        json!({ "code": " Spring20 ", "planId": plan_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["subtotal"], 1000);
    assert_eq!(quote["discount"], 200);
    assert_eq!(quote["total"], 800);
    assert_eq!(quote["promoCode"], "SPRING20");
}

#[rstest]
#[actix_web::test]
async fn settled_checkout_grants_a_subscription_and_an_invoice() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let plan_id = monthly_plan_with_promo(&app).await;

    let (status, pending) = post(
        &app,
        "/api/v1/billing/checkout",
        LEARNER_TOKEN,
        json!({ "planId": plan_id, "promoCode": "SPRING20" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(pending["status"], "pending");
    assert_eq!(pending["total"], 800);
    let transaction_id = id_of(&pending);

    let (status, _) = get(
        &app,
        &format!("/api/v1/billing/invoices/{transaction_id}"),
        LEARNER_TOKEN,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, settled) = post(
        &app,
        &format!("/api/v1/admin/billing/transactions/{transaction_id}/confirm"),
        ADMIN_TOKEN,
        json!({ "providerReference": "pi_0001" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settled["status"], "succeeded");
    assert_eq!(settled["invoiceNumber"], "INV-2026-000001");

    let (_, me) = get(&app, "/api/v1/me", LEARNER_TOKEN).await;
    let subscription = &me["user"]["subscription"];
    assert_eq!(subscription["planId"], plan_id.to_string());
    assert_eq!(
        instant(&subscription["expiresAt"]),
        term_start() + Months::new(1)
    );

    let (status, invoice) = get(
        &app,
        &format!("/api/v1/billing/invoices/{transaction_id}"),
        LEARNER_TOKEN,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoice["number"], "INV-2026-000001");
    assert_eq!(invoice["total"], 800);
    assert_eq!(invoice["companyName"], "Lingo");
}

#[rstest]
#[actix_web::test]
async fn refunds_accumulate_and_a_full_refund_ends_the_subscription() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let plan_id = monthly_plan_with_promo(&app).await;
    let (_, pending) = post(
        &app,
        "/api/v1/billing/checkout",
        LEARNER_TOKEN,
        json!({ "planId": plan_id }),
    )
    .await;
    let transaction_id = id_of(&pending);
    post(
        &app,
        &format!("/api/v1/admin/billing/transactions/{transaction_id}/confirm"),
        ADMIN_TOKEN,
        json!({ "providerReference": "pi_0002" }),
    )
    .await;
    let refunds = format!("/api/v1/admin/billing/transactions/{transaction_id}/refunds");

    let (status, partial) = post(&app, &refunds, ADMIN_TOKEN, json!({ "amount": 300 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(partial["status"], "partially_refunded");

    let (_, dashboard) = get(&app, "/api/v1/admin/dashboard", ADMIN_TOKEN).await;
    assert_eq!(dashboard["revenue"], json!([{ "currency": "USD", "amount": 700 }]));
    assert_eq!(dashboard["activeSubscribers"], 1);

    let (status, error) = post(&app, &refunds, ADMIN_TOKEN, json!({ "amount": 701 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["details"]["code"], "exceeds_refundable");

    let (status, full) = post(
        &app,
        &refunds,
        ADMIN_TOKEN,
        json!({ "amount": 700, "reason": "changed mind" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(full["status"], "refunded");
    assert_eq!(full["refunded"], 1000);

    let (status, _) = post(&app, &refunds, ADMIN_TOKEN, json!({ "amount": 1 })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, history) = get(&app, &refunds, ADMIN_TOKEN).await;
    assert_eq!(history.as_array().map(Vec::len), Some(2));

    let (_, me) = get(&app, "/api/v1/me", LEARNER_TOKEN).await;
    assert_eq!(instant(&me["user"]["subscription"]["expiresAt"]), term_start());
}

#[rstest]
#[actix_web::test]
async fn disabled_payments_block_checkout() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let plan_id = monthly_plan_with_promo(&app).await;

    let (status, settings) = call(
        &app,
        TestRequest::put()
            .uri("/api/v1/admin/billing/settings")
            .set_json(json!({
                "currency": "USD",
                "taxRateBps": 0,
                "paymentsEnabled": false,
                "invoicePrefix": "INV",
                "companyName": "Lingo"
            })),
        ADMIN_TOKEN,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["paymentsEnabled"], false);

    let (status, error) = post(
        &app,
        "/api/v1/billing/checkout",
        LEARNER_TOKEN,
        json!({ "planId": plan_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["details"]["code"], "payments_disabled");
}

#[rstest]
#[actix_web::test]
async fn learners_only_see_their_own_transactions() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let plan_id = monthly_plan_with_promo(&app).await;
    let (_, admin_purchase) = post(
        &app,
        "/api/v1/billing/checkout",
        ADMIN_TOKEN,
        json!({ "planId": plan_id }),
    )
    .await;
    post(
        &app,
        "/api/v1/billing/checkout",
        LEARNER_TOKEN,
        json!({ "planId": plan_id }),
    )
    .await;

    let (_, mine) = get(&app, "/api/v1/billing/transactions", LEARNER_TOKEN).await;
    assert_eq!(mine["data"].as_array().map(Vec::len), Some(1));

    let (status, _) = get(
        &app,
        &format!("/api/v1/billing/transactions/{}", id_of(&admin_purchase)),
        LEARNER_TOKEN,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, everything) = get(&app, "/api/v1/admin/billing/transactions", ADMIN_TOKEN).await;
    assert_eq!(everything["data"].as_array().map(Vec::len), Some(2));
}
