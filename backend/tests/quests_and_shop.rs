//! Quest lifecycle and coin spending driven through the HTTP surface.

mod support;

use actix_web::http::StatusCode;
use chrono::TimeDelta;
use rstest::rstest;
use serde_json::{Value, json};
use uuid::Uuid;

use lingo::domain::user_id_for_subject;
use support::{
    ADMIN_TOKEN, LEARNER_TOKEN, admin_create, fresh_state, get, init_app, post, seed_course,
    term_start,
};

fn warm_up_quest() -> Value {
    json!({
        "title": "Warm up",
        "kind": "weekly",
        "conditions": [{ "metric": "lessons_completed", "target": 1 }],
        "rewards": [{ "kind": "coins", "amount": 15 }],
        "startsAt": term_start() - TimeDelta::hours(1),
        "endsAt": term_start() + TimeDelta::days(7)
    })
}

fn user_quest_id(view: &Value) -> Uuid {
    view["userQuest"]["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("user quest id")
}

#[rstest]
#[actix_web::test]
async fn a_started_quest_completes_and_pays_out_once() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let course = seed_course(&app).await;
    let quest_id = admin_create(&app, "/api/v1/admin/quests", warm_up_quest()).await;

    let (status, quests) = get(&app, "/api/v1/quests", LEARNER_TOKEN).await;
    assert_eq!(status, StatusCode::OK);
    let views = quests.as_array().expect("quest views");
    assert_eq!(views.len(), 1);
    assert_eq!(views[0]["userQuest"]["status"], "assigned");
    let held = user_quest_id(&views[0]);

    let (status, started) =
        post(&app, &format!("/api/v1/quests/{held}/start"), LEARNER_TOKEN, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["userQuest"]["status"], "started");

    let (status, _) = post(
        &app,
        &format!("/api/v1/lessons/{}/complete", course.lesson_id),
        LEARNER_TOKEN,
        json!({ "mistakes": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, quests) = get(&app, "/api/v1/quests", LEARNER_TOKEN).await;
    assert_eq!(quests[0]["userQuest"]["status"], "completed");
    assert_eq!(quests[0]["percentComplete"], 100);

    let claim = format!("/api/v1/quests/{held}/claim");
    let (status, outcome) = post(&app, &claim, LEARNER_TOKEN, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["progress"]["coins"], 5 + 15);

    let (status, error) = post(&app, &claim, LEARNER_TOKEN, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["details"]["code"], "invalid_transition");

    let (status, stats) = get(
        &app,
        &format!("/api/v1/admin/quests/{quest_id}/stats"),
        ADMIN_TOKEN,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["rewardsClaimed"], 1);
}

#[rstest]
#[actix_web::test]
async fn assigned_quests_ignore_activity_until_started() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let course = seed_course(&app).await;
    admin_create(&app, "/api/v1/admin/quests", warm_up_quest()).await;

    let (_, quests) = get(&app, "/api/v1/quests", LEARNER_TOKEN).await;
    let held = user_quest_id(&quests[0]);
    post(
        &app,
        &format!("/api/v1/lessons/{}/complete", course.lesson_id),
        LEARNER_TOKEN,
        json!({}),
    )
    .await;

    let (_, quests) = get(&app, "/api/v1/quests", LEARNER_TOKEN).await;
    assert_eq!(quests[0]["userQuest"]["status"], "assigned");
    let (status, _) =
        post(&app, &format!("/api/v1/quests/{held}/claim"), LEARNER_TOKEN, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[rstest]
#[actix_web::test]
async fn quests_expire_when_their_window_closes() {
    let (clock, state) = fresh_state();
    let app = init_app(state).await;
    admin_create(&app, "/api/v1/admin/quests", warm_up_quest()).await;

    let (_, quests) = get(&app, "/api/v1/quests", LEARNER_TOKEN).await;
    let held = user_quest_id(&quests[0]);

    clock.advance_days(8);
    let (_, quests) = get(&app, "/api/v1/quests", LEARNER_TOKEN).await;
    assert_eq!(quests[0]["userQuest"]["status"], "expired");

    let (status, _) =
        post(&app, &format!("/api/v1/quests/{held}/start"), LEARNER_TOKEN, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[rstest]
#[actix_web::test]
async fn abandoned_quests_are_not_reassigned() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    admin_create(&app, "/api/v1/admin/quests", warm_up_quest()).await;

    let (_, quests) = get(&app, "/api/v1/quests", LEARNER_TOKEN).await;
    let held = user_quest_id(&quests[0]);
    let (status, abandoned) =
        post(&app, &format!("/api/v1/quests/{held}/abandon"), LEARNER_TOKEN, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(abandoned["userQuest"]["status"], "abandoned");

    let (_, quests) = get(&app, "/api/v1/quests", LEARNER_TOKEN).await;
    let views = quests.as_array().expect("quest views");
    assert_eq!(views.len(), 1);
    assert_eq!(user_quest_id(&views[0]), held);
}

async fn stock_heart_refill<S>(app: &S) -> Uuid
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<actix_web::body::BoxBody>,
            Error = actix_web::Error,
        >,
{
    let category_id = admin_create(
        app,
        "/api/v1/admin/shop/categories",
        json!({ "name": "Power-ups", "slug": "power-ups", "order": 1 }),
    )
    .await;
    admin_create(
        app,
        "/api/v1/admin/shop/items",
        json!({
            "categoryId": category_id,
            "name": "Heart refill",
            "price": 10,
            "effect": "heart_refill"
        }),
    )
    .await
}

#[rstest]
#[actix_web::test]
async fn purchases_need_enough_coins() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let item_id = stock_heart_refill(&app).await;

    let (status, error) = post(
        &app,
        &format!("/api/v1/shop/items/{item_id}/purchase"),
        LEARNER_TOKEN,
        json!({ "quantity": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["details"]["code"], "insufficient_coins");
}

#[rstest]
#[actix_web::test]
async fn heart_refills_spend_coins_and_restore_hearts() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let course = seed_course(&app).await;
    let item_id = stock_heart_refill(&app).await;

    let (exercise_id, _) = course.exercises[0];
    post(
        &app,
        &format!(
            "/api/v1/lessons/{}/exercises/{exercise_id}/answer",
            course.lesson_id
        ),
        LEARNER_TOKEN,
        json!({ "answer": "Adiós" }),
    )
    .await;
    let learner_id = user_id_for_subject("fixture-learner");
    let (status, _) = post(
        &app,
        &format!("/api/v1/admin/users/{learner_id}/wallet"),
        ADMIN_TOKEN,
        json!({ "coins": 25 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, receipt) = post(
        &app,
        &format!("/api/v1/shop/items/{item_id}/purchase"),
        LEARNER_TOKEN,
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["progress"]["coins"], 15);
    assert_eq!(receipt["progress"]["hearts"], 5);
    assert_eq!(receipt["purchase"]["quantity"], 1);

    let (status, purchases) = get(&app, "/api/v1/shop/purchases", LEARNER_TOKEN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(purchases["data"].as_array().map(Vec::len), Some(1));
    assert!(purchases.get("nextCursor").is_none());
}

#[rstest]
#[actix_web::test]
async fn inactive_items_are_hidden_from_the_storefront() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let category_id = admin_create(
        &app,
        "/api/v1/admin/shop/categories",
        json!({ "name": "Cosmetics", "slug": "cosmetics" }),
    )
    .await;
    admin_create(
        &app,
        "/api/v1/admin/shop/items",
        json!({
            "categoryId": category_id,
            "name": "Retired hat",
            "price": 50,
            "effect": "cosmetic",
            "active": false
        }),
    )
    .await;

    let (_, storefront) = get(&app, "/api/v1/shop/items", LEARNER_TOKEN).await;
    assert_eq!(storefront.as_array().map(Vec::len), Some(0));
    let (_, catalogue) = get(&app, "/api/v1/admin/shop/items", ADMIN_TOKEN).await;
    assert_eq!(catalogue.as_array().map(Vec::len), Some(1));
}
