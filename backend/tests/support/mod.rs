//! Shared harness for HTTP integration tests.
//!
//! Every test crate builds the full `/api/v1` surface over a fresh
//! in-memory document store, authenticates with the fixture tokens and
//! drives time through a [`MutableClock`].
#![allow(
    dead_code,
    reason = "each integration test crate uses a different subset of helpers"
)]

use std::sync::Arc;

use actix_http::Request;
use actix_web::body::BoxBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::http::header::AUTHORIZATION;
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use lingo::Trace;
use lingo::domain::ports::FixtureTextToSpeechSource;
use lingo::inbound::http::configure_api;
use lingo::inbound::http::error::request_error_configs;
use lingo::inbound::http::state::HttpState;
use lingo::outbound::documents::{InMemoryDocumentStore, document_repositories};
use lingo::outbound::identity::FixtureIdentityProvider;
pub use lingo::outbound::identity::{ADMIN_TOKEN, LEARNER_TOKEN};
use lingo::test_support::MutableClock;

/// Monday 2 March 2026, 09:00 UTC.
pub fn term_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Fresh state over an empty in-memory store, with the clock it reads.
pub fn fresh_state() -> (Arc<MutableClock>, web::Data<HttpState>) {
    let clock = Arc::new(MutableClock::new(term_start()));
    let state = HttpState::from_repositories(
        document_repositories(Arc::new(InMemoryDocumentStore::new())),
        Arc::new(FixtureIdentityProvider),
        Arc::new(FixtureTextToSpeechSource),
        Arc::clone(&clock) as Arc<dyn mockable::Clock>,
    );
    (clock, web::Data::new(state))
}

pub async fn init_app(
    state: web::Data<HttpState>,
) -> impl Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error> {
    let (json, path, query) = request_error_configs();
    test::init_service(
        App::new()
            .app_data(state)
            .app_data(json)
            .app_data(path)
            .app_data(query)
            .wrap(Trace)
            .service(web::scope("/api/v1").configure(configure_api)),
    )
    .await
}

/// Send `request` as the holder of `token`; an empty body reads as `null`.
pub async fn call<S>(app: &S, request: TestRequest, token: &str) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    let request = request
        .insert_header((AUTHORIZATION, format!("Bearer {token}")))
        .to_request();
    let response = test::call_service(app, request).await;
    let status = response.status();
    let bytes = test::read_body(response).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

pub async fn get<S>(app: &S, uri: &str, token: &str) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    call(app, TestRequest::get().uri(uri), token).await
}

pub async fn post<S>(app: &S, uri: &str, token: &str, body: Value) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    call(app, TestRequest::post().uri(uri).set_json(body), token).await
}

/// Create a resource through an admin route and return its `id`.
pub async fn admin_create<S>(app: &S, uri: &str, body: Value) -> Uuid
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    let (status, created) = post(app, uri, ADMIN_TOKEN, body).await;
    assert!(status.is_success(), "POST {uri} failed with {status}: {created}");
    id_of(&created)
}

pub fn id_of(value: &Value) -> Uuid {
    value["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .expect("body carries an id")
}

/// A published one-lesson Spanish course.
pub struct Course {
    pub language_id: Uuid,
    pub lesson_id: Uuid,
    /// Exercise ids with their correct answers, in lesson order.
    pub exercises: Vec<(Uuid, &'static str)>,
}

pub async fn seed_course<S>(app: &S) -> Course
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    let language_id = admin_create(
        app,
        "/api/v1/admin/languages",
        json!({ "code": "es", "name": "Spanish", "nativeName": "Español", "published": true }),
    )
    .await;
    let chapter_id = admin_create(
        app,
        "/api/v1/admin/chapters",
        json!({ "languageId": language_id, "title": "Basics", "order": 1 }),
    )
    .await;
    let unit_id = admin_create(
        app,
        "/api/v1/admin/units",
        json!({ "chapterId": chapter_id, "title": "Greetings", "order": 1 }),
    )
    .await;
    let lesson_id = admin_create(
        app,
        "/api/v1/admin/lessons",
        json!({ "unitId": unit_id, "title": "Hello", "order": 1, "xpReward": 20 }),
    )
    .await;
    let choice = admin_create(
        app,
        "/api/v1/admin/exercises",
        json!({
            "lessonId": lesson_id,
            "kind": "multiple_choice",
            "prompt": "Hello",
            "options": ["Hola", "Adiós"],
            "answer": "Hola",
            "order": 1
        }),
    )
    .await;
    let translate = admin_create(
        app,
        "/api/v1/admin/exercises",
        json!({
            "lessonId": lesson_id,
            "kind": "translate",
            "prompt": "Thank you",
            "answer": "Gracias",
            "order": 2
        }),
    )
    .await;
    Course {
        language_id,
        lesson_id,
        exercises: vec![(choice, "Hola"), (translate, "Gracias")],
    }
}
