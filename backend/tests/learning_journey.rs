//! End-to-end learning loop over the in-memory store: curriculum authoring,
//! answers, lesson completion and streaks.

mod support;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use rstest::rstest;
use serde_json::json;

use support::{
    ADMIN_TOKEN, LEARNER_TOKEN, admin_create, call, fresh_state, get, init_app, post, seed_course,
};

#[rstest]
#[actix_web::test]
async fn completing_a_lesson_pays_xp_coins_and_starts_a_streak() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let course = seed_course(&app).await;

    for (exercise_id, answer) in &course.exercises {
        let (status, outcome) = post(
            &app,
            &format!(
                "/api/v1/lessons/{}/exercises/{exercise_id}/answer",
                course.lesson_id
            ),
            LEARNER_TOKEN,
            json!({ "answer": format!("  {}  ", answer.to_uppercase()) }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["correct"], true);
        assert!(outcome.get("expectedAnswer").is_none());
    }

    let (status, completion) = post(
        &app,
        &format!("/api/v1/lessons/{}/complete", course.lesson_id),
        LEARNER_TOKEN,
        json!({ "mistakes": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completion["reward"]["xp"], 20);
    assert_eq!(completion["reward"]["coins"], 10);
    assert_eq!(completion["reward"]["firstCompletion"], true);
    assert_eq!(completion["progress"]["xp"], 20);
    assert_eq!(completion["progress"]["streakDays"], 1);

    let (status, tree) = get(
        &app,
        &format!("/api/v1/languages/{}/course", course.language_id),
        LEARNER_TOKEN,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree["totals"]["lessons"], 1);
    assert_eq!(tree["totals"]["completedLessons"], 1);
    assert_eq!(tree["totals"]["percentComplete"], 100);
    assert_eq!(tree["chapters"][0]["units"][0]["lessons"][0]["completed"], true);
}

#[rstest]
#[actix_web::test]
async fn repeating_a_lesson_the_next_day_extends_the_streak_at_half_xp() {
    let (clock, state) = fresh_state();
    let app = init_app(state).await;
    let course = seed_course(&app).await;
    let complete = format!("/api/v1/lessons/{}/complete", course.lesson_id);

    let (status, _) = post(&app, &complete, LEARNER_TOKEN, json!({})).await;
    assert_eq!(status, StatusCode::OK);

    clock.advance_days(1);
    let (status, completion) =
        post(&app, &complete, LEARNER_TOKEN, json!({ "mistakes": 2 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completion["reward"]["xp"], 10);
    assert_eq!(completion["reward"]["coins"], 5);
    assert_eq!(completion["reward"]["firstCompletion"], false);
    assert_eq!(completion["streakChange"], "extended");
    assert_eq!(completion["progress"]["streakDays"], 2);
    assert_eq!(completion["progress"]["xp"], 30);
}

#[rstest]
#[actix_web::test]
async fn wrong_answers_cost_a_heart_and_reveal_the_answer() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let course = seed_course(&app).await;
    let (exercise_id, _) = course.exercises[1];

    let (status, outcome) = post(
        &app,
        &format!(
            "/api/v1/lessons/{}/exercises/{exercise_id}/answer",
            course.lesson_id
        ),
        LEARNER_TOKEN,
        json!({ "answer": "Por favor" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["correct"], false);
    assert_eq!(outcome["expectedAnswer"], "Gracias");
    assert_eq!(outcome["hearts"], 4);

    let (_, progress) = get(&app, "/api/v1/progress", LEARNER_TOKEN).await;
    assert_eq!(progress["hearts"], 4);
}

#[rstest]
#[actix_web::test]
async fn running_out_of_hearts_blocks_answers() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let course = seed_course(&app).await;
    let (exercise_id, _) = course.exercises[0];
    let uri = format!(
        "/api/v1/lessons/{}/exercises/{exercise_id}/answer",
        course.lesson_id
    );

    for _ in 0..5 {
        let (status, _) = post(&app, &uri, LEARNER_TOKEN, json!({ "answer": "Adiós" })).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, error) = post(&app, &uri, LEARNER_TOKEN, json!({ "answer": "Hola" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["details"]["code"], "out_of_hearts");
}

#[rstest]
#[actix_web::test]
async fn lesson_views_hide_answers() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let course = seed_course(&app).await;

    let (status, view) = get(
        &app,
        &format!("/api/v1/lessons/{}", course.lesson_id),
        LEARNER_TOKEN,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let exercises = view["exercises"].as_array().expect("exercises");
    assert_eq!(exercises.len(), 2);
    assert!(exercises.iter().all(|exercise| exercise.get("answer").is_none()));
    assert_eq!(view["completed"], false);
}

#[rstest]
#[actix_web::test]
async fn unpublished_languages_are_hidden_from_learners() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    seed_course(&app).await;
    let draft_id = admin_create(
        &app,
        "/api/v1/admin/languages",
        json!({ "code": "fr", "name": "French", "nativeName": "Français" }),
    )
    .await;

    let (_, listed) = get(&app, "/api/v1/languages", LEARNER_TOKEN).await;
    let codes: Vec<&str> = listed
        .as_array()
        .expect("languages")
        .iter()
        .filter_map(|language| language["code"].as_str())
        .collect();
    assert_eq!(codes, ["es"]);

    let (status, _) = get(
        &app,
        &format!("/api/v1/languages/{draft_id}/course"),
        LEARNER_TOKEN,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(
        &app,
        &format!("/api/v1/languages/{draft_id}/course"),
        ADMIN_TOKEN,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[rstest]
#[actix_web::test]
async fn selecting_a_course_is_remembered() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;
    let course = seed_course(&app).await;

    let (status, progress) = call(
        &app,
        TestRequest::put()
            .uri("/api/v1/progress/course")
            .set_json(json!({ "languageId": course.language_id })),
        LEARNER_TOKEN,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["activeLanguageId"], course.language_id.to_string());

    let (_, me) = get(&app, "/api/v1/me", LEARNER_TOKEN).await;
    assert_eq!(me["progress"]["activeLanguageId"], course.language_id.to_string());
}

#[rstest]
#[actix_web::test]
async fn learners_cannot_author_content() {
    let (_clock, state) = fresh_state();
    let app = init_app(state).await;

    let (status, _) = post(
        &app,
        "/api/v1/admin/languages",
        LEARNER_TOKEN,
        json!({ "code": "de", "name": "German", "nativeName": "Deutsch" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
