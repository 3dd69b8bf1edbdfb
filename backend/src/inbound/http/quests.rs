//! Quest handlers.
//!
//! Learner routes address the caller's own user quests by their id. Admin
//! routes manage quest definitions.
//!
//! ```text
//! GET    /api/v1/quests
//! POST   /api/v1/quests/{id}/start
//! POST   /api/v1/quests/{id}/abandon
//! POST   /api/v1/quests/{id}/claim
//! GET    /api/v1/admin/quests            POST /api/v1/admin/quests
//! GET    /api/v1/admin/quests/{id}       PUT, DELETE
//! GET    /api/v1/admin/quests/{id}/stats
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::ports::ClaimOutcome;
use crate::domain::quests::{Quest, QuestDraft, QuestStats, UserQuestView};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthContext;
use crate::inbound::http::state::HttpState;

/// The caller's quests, refreshed for expiry and newly opened quests.
#[utoipa::path(
    get,
    path = "/api/v1/quests",
    responses(
        (status = 200, description = "Caller's quests", body = [UserQuestView]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["quests"],
    operation_id = "listMyQuests"
)]
#[get("/quests")]
pub async fn list_my_quests(
    state: web::Data<HttpState>,
    auth: AuthContext,
) -> ApiResult<HttpResponse> {
    let quests = state.user_quests.list_my_quests(auth.user()).await?;
    Ok(HttpResponse::Ok().json(quests))
}

#[utoipa::path(
    post,
    path = "/api/v1/quests/{id}/start",
    params(("id" = Uuid, Path, description = "User quest id")),
    responses(
        (status = 200, description = "Started", body = UserQuestView),
        (status = 404, description = "Unknown user quest", body = Error),
        (status = 409, description = "Invalid transition", body = Error)
    ),
    tags = ["quests"],
    operation_id = "startQuest"
)]
#[post("/quests/{id}/start")]
pub async fn start_quest(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let view = state
        .user_quests
        .start_quest(auth.user(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    post,
    path = "/api/v1/quests/{id}/abandon",
    params(("id" = Uuid, Path, description = "User quest id")),
    responses(
        (status = 200, description = "Abandoned", body = UserQuestView),
        (status = 404, description = "Unknown user quest", body = Error),
        (status = 409, description = "Invalid transition", body = Error)
    ),
    tags = ["quests"],
    operation_id = "abandonQuest"
)]
#[post("/quests/{id}/abandon")]
pub async fn abandon_quest(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let view = state
        .user_quests
        .abandon_quest(auth.user(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Pay out the rewards of a completed quest.
#[utoipa::path(
    post,
    path = "/api/v1/quests/{id}/claim",
    params(("id" = Uuid, Path, description = "User quest id")),
    responses(
        (status = 200, description = "Rewards applied", body = ClaimOutcome),
        (status = 404, description = "Unknown user quest", body = Error),
        (status = 409, description = "Not completed or already claimed", body = Error)
    ),
    tags = ["quests"],
    operation_id = "claimQuestReward"
)]
#[post("/quests/{id}/claim")]
pub async fn claim_reward(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let outcome = state
        .user_quests
        .claim_reward(auth.user(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/quests",
    responses(
        (status = 200, description = "Quest definitions", body = [Quest]),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "listQuests"
)]
#[get("/admin/quests")]
pub async fn list_quests(
    state: web::Data<HttpState>,
    auth: AuthContext,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let quests = state.quests_query.list_quests().await?;
    Ok(HttpResponse::Ok().json(quests))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/quests",
    request_body = QuestDraft,
    responses(
        (status = 201, description = "Created", body = Quest),
        (status = 400, description = "Invalid quest", body = Error),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "createQuest"
)]
#[post("/admin/quests")]
pub async fn create_quest(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<QuestDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let quest = state.quests.create_quest(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(quest))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/quests/{id}",
    params(("id" = Uuid, Path, description = "Quest id")),
    responses(
        (status = 200, description = "Quest", body = Quest),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown quest", body = Error)
    ),
    tags = ["admin"],
    operation_id = "getQuest"
)]
#[get("/admin/quests/{id}")]
pub async fn get_quest(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let quest = state.quests_query.get_quest(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(quest))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/quests/{id}",
    params(("id" = Uuid, Path, description = "Quest id")),
    request_body = QuestDraft,
    responses(
        (status = 200, description = "Updated", body = Quest),
        (status = 400, description = "Invalid quest", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown quest", body = Error)
    ),
    tags = ["admin"],
    operation_id = "updateQuest"
)]
#[put("/admin/quests/{id}")]
pub async fn update_quest(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<QuestDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let quest = state
        .quests
        .update_quest(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(quest))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/quests/{id}",
    params(("id" = Uuid, Path, description = "Quest id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown quest", body = Error),
        (status = 409, description = "Quest is held by learners", body = Error)
    ),
    tags = ["admin"],
    operation_id = "deleteQuest"
)]
#[delete("/admin/quests/{id}")]
pub async fn delete_quest(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    state.quests.delete_quest(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Lifecycle counters across all learners holding the quest.
#[utoipa::path(
    get,
    path = "/api/v1/admin/quests/{id}/stats",
    params(("id" = Uuid, Path, description = "Quest id")),
    responses(
        (status = 200, description = "Statistics", body = QuestStats),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown quest", body = Error)
    ),
    tags = ["admin"],
    operation_id = "getQuestStats"
)]
#[get("/admin/quests/{id}/stats")]
pub async fn quest_stats(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let stats = state.quests_query.quest_stats(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// Register the quest routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_my_quests)
        .service(start_quest)
        .service(abandon_quest)
        .service(claim_reward)
        .service(list_quests)
        .service(create_quest)
        .service(get_quest)
        .service(update_quest)
        .service(delete_quest)
        .service(quest_stats);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use chrono::{Duration, Utc};
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::ports::{MockQuestCommand, MockQuestQuery, MockUserQuestCommand};
    use crate::domain::quests::{QuestCondition, QuestKind, QuestMetric, UserQuest};
    use crate::domain::user::UserProgress;
    use crate::inbound::http::test_utils::{admin, app_with, authed, error_body, learner, state_for};

    fn routes(cfg: &mut web::ServiceConfig) {
        cfg.service(web::scope("/api/v1").configure(configure));
    }

    fn quest() -> Quest {
        let now = Utc::now();
        Quest {
            id: Uuid::new_v4(),
            title: "Three lessons".to_owned(),
            description: None,
            kind: QuestKind::Daily,
            conditions: vec![QuestCondition {
                metric: QuestMetric::LessonsCompleted,
                target: 3,
            }],
            rewards: vec![],
            starts_at: now - Duration::hours(1),
            ends_at: now + Duration::hours(23),
            active: true,
        }
    }

    fn view(user_id: Uuid) -> UserQuestView {
        let quest = quest();
        UserQuestView::new(UserQuest::assign(&quest, user_id, Utc::now()), quest)
    }

    #[rstest]
    #[actix_web::test]
    async fn my_quests_are_listed_for_the_caller() {
        let user = learner();
        let user_id = user.id;
        let mut state = state_for(user);
        let mut user_quests = MockUserQuestCommand::new();
        user_quests
            .expect_list_my_quests()
            .withf(move |user| user.id == user_id)
            .returning(|user| Ok(vec![view(user.id)]));
        state.user_quests = Arc::new(user_quests);
        let app = actix_test::init_service(app_with(state, routes)).await;

        let response = actix_test::call_service(
            &app,
            authed(actix_test::TestRequest::get().uri("/api/v1/quests")).to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body[0]["userQuest"]["status"], "assigned");
        assert_eq!(body[0]["percentComplete"], 0);
    }

    #[rstest]
    #[actix_web::test]
    async fn invalid_transitions_are_conflicts() {
        let mut state = state_for(learner());
        let mut user_quests = MockUserQuestCommand::new();
        user_quests.expect_start_quest().returning(|_, _| {
            Err(Error::conflict_with_code(
                "invalid_transition",
                "cannot start a completed quest",
            ))
        });
        state.user_quests = Arc::new(user_quests);
        let app = actix_test::init_service(app_with(state, routes)).await;

        let response = actix_test::call_service(
            &app,
            authed(
                actix_test::TestRequest::post()
                    .uri(&format!("/api/v1/quests/{}/start", Uuid::new_v4())),
            )
            .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = error_body(&actix_test::read_body(response).await);
        assert_eq!(body.details().expect("details")["code"], "invalid_transition");
    }

    #[rstest]
    #[actix_web::test]
    async fn claiming_returns_quest_and_progress() {
        let user = learner();
        let mut state = state_for(user);
        let mut user_quests = MockUserQuestCommand::new();
        user_quests.expect_claim_reward().returning(|user, _| {
            Ok(ClaimOutcome {
                quest: view(user.id),
                progress: UserProgress::new(user.id),
            })
        });
        state.user_quests = Arc::new(user_quests);
        let app = actix_test::init_service(app_with(state, routes)).await;

        let response = actix_test::call_service(
            &app,
            authed(
                actix_test::TestRequest::post()
                    .uri(&format!("/api/v1/quests/{}/claim", Uuid::new_v4())),
            )
            .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert!(body.get("quest").is_some());
        assert!(body.get("progress").is_some());
    }

    #[rstest]
    #[actix_web::test]
    async fn admins_create_quests() {
        let mut state = state_for(admin());
        let mut command = MockQuestCommand::new();
        command
            .expect_create_quest()
            .withf(|draft| draft.active && draft.conditions.len() == 1)
            .returning(|draft| {
                let mut created = quest();
                created.title = draft.title;
                Ok(created)
            });
        state.quests = Arc::new(command);
        let app = actix_test::init_service(app_with(state, routes)).await;

        let response = actix_test::call_service(
            &app,
            authed(actix_test::TestRequest::post().uri("/api/v1/admin/quests"))
                .set_json(json!({
                    "title": "Weekend sprint",
                    "kind": "event",
                    "conditions": [{ "metric": "xp_earned", "target": 100 }],
                    "rewards": [{ "kind": "coins", "amount": 20 }],
                    "startsAt": "2026-03-07T00:00:00Z",
                    "endsAt": "2026-03-09T00:00:00Z"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["title"], "Weekend sprint");
    }

    #[rstest]
    #[actix_web::test]
    async fn stats_are_admin_only() {
        let app = actix_test::init_service(app_with(state_for(learner()), routes)).await;
        let response = actix_test::call_service(
            &app,
            authed(
                actix_test::TestRequest::get()
                    .uri(&format!("/api/v1/admin/quests/{}/stats", Uuid::new_v4())),
            )
            .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[rstest]
    #[actix_web::test]
    async fn stats_are_returned_to_admins() {
        let quest_id = Uuid::new_v4();
        let mut state = state_for(admin());
        let mut query = MockQuestQuery::new();
        query.expect_quest_stats().returning(|id| {
            Ok(QuestStats {
                quest_id: id,
                completed: 2,
                rewards_claimed: 1,
                ..QuestStats::default()
            })
        });
        state.quests_query = Arc::new(query);
        let app = actix_test::init_service(app_with(state, routes)).await;

        let response = actix_test::call_service(
            &app,
            authed(actix_test::TestRequest::get().uri(&format!("/api/v1/admin/quests/{quest_id}/stats")))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["questId"], quest_id.to_string());
        assert_eq!(body["rewardsClaimed"], 1);
    }
}
