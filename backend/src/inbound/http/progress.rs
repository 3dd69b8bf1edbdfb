//! Learning loop handlers: course selection, answers and lesson completion.
//!
//! ```text
//! GET  /api/v1/progress
//! PUT  /api/v1/progress/course
//! POST /api/v1/lessons/{lessonId}/exercises/{exerciseId}/answer
//! POST /api/v1/lessons/{lessonId}/complete
//! ```

use actix_web::{HttpResponse, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::progress::{AnswerOutcome, LessonCompletion};
use crate::domain::user::UserProgress;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthContext;
use crate::inbound::http::state::HttpState;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectCourseRequest {
    pub language_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    #[schema(example = "hola")]
    pub answer: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLessonRequest {
    /// Wrong answers given during the lesson.
    #[serde(default)]
    pub mistakes: u32,
}

#[utoipa::path(
    get,
    path = "/api/v1/progress",
    responses(
        (status = 200, description = "Caller's progress", body = UserProgress),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["progress"],
    operation_id = "getProgress"
)]
#[get("/progress")]
pub async fn get_progress(
    state: web::Data<HttpState>,
    auth: AuthContext,
) -> ApiResult<HttpResponse> {
    let progress = state.progress_query.get_progress(auth.user()).await?;
    Ok(HttpResponse::Ok().json(progress))
}

/// Make a published language the active course.
#[utoipa::path(
    put,
    path = "/api/v1/progress/course",
    request_body = SelectCourseRequest,
    responses(
        (status = 200, description = "Updated progress", body = UserProgress),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown or unpublished language", body = Error)
    ),
    tags = ["progress"],
    operation_id = "selectCourse"
)]
#[put("/progress/course")]
pub async fn select_course(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<SelectCourseRequest>,
) -> ApiResult<HttpResponse> {
    let progress = state
        .progress
        .select_course(auth.user(), payload.language_id)
        .await?;
    Ok(HttpResponse::Ok().json(progress))
}

/// Check an answer; a wrong answer costs a heart.
#[utoipa::path(
    post,
    path = "/api/v1/lessons/{lessonId}/exercises/{exerciseId}/answer",
    params(
        ("lessonId" = Uuid, Path, description = "Lesson id"),
        ("exerciseId" = Uuid, Path, description = "Exercise id")
    ),
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "Answer checked", body = AnswerOutcome),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown lesson or exercise", body = Error),
        (status = 409, description = "No hearts left", body = Error)
    ),
    tags = ["progress"],
    operation_id = "checkAnswer"
)]
#[post("/lessons/{lesson_id}/exercises/{exercise_id}/answer")]
pub async fn check_answer(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<(Uuid, Uuid)>,
    payload: web::Json<AnswerRequest>,
) -> ApiResult<HttpResponse> {
    let (lesson_id, exercise_id) = path.into_inner();
    let outcome = state
        .progress
        .check_answer(
            auth.user(),
            lesson_id,
            exercise_id,
            payload.into_inner().answer,
        )
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Finish a lesson and collect its rewards.
#[utoipa::path(
    post,
    path = "/api/v1/lessons/{lessonId}/complete",
    params(("lessonId" = Uuid, Path, description = "Lesson id")),
    request_body = CompleteLessonRequest,
    responses(
        (status = 200, description = "Rewards and updated progress", body = LessonCompletion),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown lesson", body = Error),
        (status = 409, description = "Concurrent update", body = Error)
    ),
    tags = ["progress"],
    operation_id = "completeLesson"
)]
#[post("/lessons/{lesson_id}/complete")]
pub async fn complete_lesson(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<CompleteLessonRequest>,
) -> ApiResult<HttpResponse> {
    let completion = state
        .progress
        .complete_lesson(auth.user(), path.into_inner(), payload.mistakes)
        .await?;
    Ok(HttpResponse::Ok().json(completion))
}

/// Register the progress routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_progress)
        .service(select_course)
        .service(check_answer)
        .service(complete_lesson);
}
