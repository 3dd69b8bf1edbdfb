//! Course content handlers.
//!
//! Learners browse published languages, the course tree and single lessons.
//! Administrators manage every level of the tree.
//!
//! ```text
//! GET    /api/v1/languages
//! GET    /api/v1/languages/{id}/course
//! GET    /api/v1/lessons/{id}
//! GET    /api/v1/admin/languages            POST /api/v1/admin/languages
//! GET    /api/v1/admin/languages/{id}       PUT, DELETE
//! GET    /api/v1/admin/languages/{id}/chapters
//! POST   /api/v1/admin/chapters             PUT, DELETE /api/v1/admin/chapters/{id}
//! GET    /api/v1/admin/chapters/{id}/units
//! POST   /api/v1/admin/units                PUT, DELETE /api/v1/admin/units/{id}
//! GET    /api/v1/admin/units/{id}/lessons
//! PUT    /api/v1/admin/units/{id}/lesson-order
//! POST   /api/v1/admin/lessons              PUT, DELETE /api/v1/admin/lessons/{id}
//! GET    /api/v1/admin/lessons/{id}/exercises
//! POST   /api/v1/admin/exercises            PUT, DELETE /api/v1/admin/exercises/{id}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::curriculum::{
    Chapter, ChapterDraft, CourseTree, Exercise, ExerciseDraft, Language, LanguageDraft, Lesson,
    LessonDraft, LessonView, Unit, UnitDraft,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthContext;
use crate::inbound::http::state::HttpState;

/// Complete ordering of a unit's lessons.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonOrderRequest {
    pub lesson_ids: Vec<Uuid>,
}

/// Published languages.
#[utoipa::path(
    get,
    path = "/api/v1/languages",
    responses(
        (status = 200, description = "Published languages", body = [Language]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["curriculum"],
    operation_id = "listLanguages"
)]
#[get("/languages")]
pub async fn list_languages(
    state: web::Data<HttpState>,
    _auth: AuthContext,
) -> ApiResult<HttpResponse> {
    let languages = state.curriculum_query.list_languages(false).await?;
    Ok(HttpResponse::Ok().json(languages))
}

/// Nested chapters, units and lessons with the caller's completion.
#[utoipa::path(
    get,
    path = "/api/v1/languages/{id}/course",
    params(("id" = Uuid, Path, description = "Language id")),
    responses(
        (status = 200, description = "Course tree", body = CourseTree),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown or unpublished language", body = Error)
    ),
    tags = ["curriculum"],
    operation_id = "getCourseTree"
)]
#[get("/languages/{id}/course")]
pub async fn get_course_tree(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let tree = state
        .curriculum_query
        .course_tree(auth.user(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(tree))
}

/// A lesson with its exercises; answers are withheld.
#[utoipa::path(
    get,
    path = "/api/v1/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Lesson", body = LessonView),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown lesson", body = Error)
    ),
    tags = ["curriculum"],
    operation_id = "getLesson"
)]
#[get("/lessons/{id}")]
pub async fn get_lesson(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let view = state
        .curriculum_query
        .lesson_view(auth.user(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Every language, published or not.
#[utoipa::path(
    get,
    path = "/api/v1/admin/languages",
    responses(
        (status = 200, description = "Languages", body = [Language]),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminListLanguages"
)]
#[get("/admin/languages")]
pub async fn admin_list_languages(
    state: web::Data<HttpState>,
    auth: AuthContext,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let languages = state.curriculum_query.list_languages(true).await?;
    Ok(HttpResponse::Ok().json(languages))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/languages",
    request_body = LanguageDraft,
    responses(
        (status = 201, description = "Created", body = Language),
        (status = 400, description = "Invalid language", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 409, description = "Language code already used", body = Error)
    ),
    tags = ["admin"],
    operation_id = "createLanguage"
)]
#[post("/admin/languages")]
pub async fn create_language(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<LanguageDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let language = state.curriculum.create_language(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(language))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/languages/{id}",
    params(("id" = Uuid, Path, description = "Language id")),
    responses(
        (status = 200, description = "Language", body = Language),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown language", body = Error)
    ),
    tags = ["admin"],
    operation_id = "getLanguage"
)]
#[get("/admin/languages/{id}")]
pub async fn get_language(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let language = state.curriculum_query.get_language(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(language))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/languages/{id}",
    params(("id" = Uuid, Path, description = "Language id")),
    request_body = LanguageDraft,
    responses(
        (status = 200, description = "Updated", body = Language),
        (status = 400, description = "Invalid language", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown language", body = Error),
        (status = 409, description = "Language code already used", body = Error)
    ),
    tags = ["admin"],
    operation_id = "updateLanguage"
)]
#[put("/admin/languages/{id}")]
pub async fn update_language(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<LanguageDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let language = state
        .curriculum
        .update_language(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(language))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/languages/{id}",
    params(("id" = Uuid, Path, description = "Language id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown language", body = Error),
        (status = 409, description = "Language still has chapters", body = Error)
    ),
    tags = ["admin"],
    operation_id = "deleteLanguage"
)]
#[delete("/admin/languages/{id}")]
pub async fn delete_language(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    state.curriculum.delete_language(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/languages/{id}/chapters",
    params(("id" = Uuid, Path, description = "Language id")),
    responses(
        (status = 200, description = "Chapters ordered by `order`", body = [Chapter]),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown language", body = Error)
    ),
    tags = ["admin"],
    operation_id = "listChapters"
)]
#[get("/admin/languages/{id}/chapters")]
pub async fn list_chapters(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let chapters = state.curriculum_query.list_chapters(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(chapters))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/chapters",
    request_body = ChapterDraft,
    responses(
        (status = 201, description = "Created", body = Chapter),
        (status = 400, description = "Invalid chapter", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown language", body = Error),
        (status = 409, description = "Order already used", body = Error)
    ),
    tags = ["admin"],
    operation_id = "createChapter"
)]
#[post("/admin/chapters")]
pub async fn create_chapter(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<ChapterDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let chapter = state.curriculum.create_chapter(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(chapter))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/chapters/{id}",
    params(("id" = Uuid, Path, description = "Chapter id")),
    request_body = ChapterDraft,
    responses(
        (status = 200, description = "Updated", body = Chapter),
        (status = 400, description = "Invalid chapter", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown chapter", body = Error),
        (status = 409, description = "Order already used", body = Error)
    ),
    tags = ["admin"],
    operation_id = "updateChapter"
)]
#[put("/admin/chapters/{id}")]
pub async fn update_chapter(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<ChapterDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let chapter = state
        .curriculum
        .update_chapter(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(chapter))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/chapters/{id}",
    params(("id" = Uuid, Path, description = "Chapter id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown chapter", body = Error),
        (status = 409, description = "Chapter still has units", body = Error)
    ),
    tags = ["admin"],
    operation_id = "deleteChapter"
)]
#[delete("/admin/chapters/{id}")]
pub async fn delete_chapter(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    state.curriculum.delete_chapter(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/chapters/{id}/units",
    params(("id" = Uuid, Path, description = "Chapter id")),
    responses(
        (status = 200, description = "Units ordered by `order`", body = [Unit]),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown chapter", body = Error)
    ),
    tags = ["admin"],
    operation_id = "listUnits"
)]
#[get("/admin/chapters/{id}/units")]
pub async fn list_units(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let units = state.curriculum_query.list_units(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(units))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/units",
    request_body = UnitDraft,
    responses(
        (status = 201, description = "Created", body = Unit),
        (status = 400, description = "Invalid unit", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown chapter", body = Error),
        (status = 409, description = "Order already used", body = Error)
    ),
    tags = ["admin"],
    operation_id = "createUnit"
)]
#[post("/admin/units")]
pub async fn create_unit(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<UnitDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let unit = state.curriculum.create_unit(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(unit))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/units/{id}",
    params(("id" = Uuid, Path, description = "Unit id")),
    request_body = UnitDraft,
    responses(
        (status = 200, description = "Updated", body = Unit),
        (status = 400, description = "Invalid unit", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown unit", body = Error),
        (status = 409, description = "Order already used", body = Error)
    ),
    tags = ["admin"],
    operation_id = "updateUnit"
)]
#[put("/admin/units/{id}")]
pub async fn update_unit(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<UnitDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let unit = state
        .curriculum
        .update_unit(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(unit))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/units/{id}",
    params(("id" = Uuid, Path, description = "Unit id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown unit", body = Error),
        (status = 409, description = "Unit still has lessons", body = Error)
    ),
    tags = ["admin"],
    operation_id = "deleteUnit"
)]
#[delete("/admin/units/{id}")]
pub async fn delete_unit(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    state.curriculum.delete_unit(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/units/{id}/lessons",
    params(("id" = Uuid, Path, description = "Unit id")),
    responses(
        (status = 200, description = "Lessons ordered by `order`", body = [Lesson]),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown unit", body = Error)
    ),
    tags = ["admin"],
    operation_id = "listLessons"
)]
#[get("/admin/units/{id}/lessons")]
pub async fn list_lessons(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let lessons = state.curriculum_query.list_lessons(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(lessons))
}

/// Replace the ordering of all lessons in a unit.
#[utoipa::path(
    put,
    path = "/api/v1/admin/units/{id}/lesson-order",
    params(("id" = Uuid, Path, description = "Unit id")),
    request_body = LessonOrderRequest,
    responses(
        (status = 200, description = "Lessons in their new order", body = [Lesson]),
        (status = 400, description = "Ids do not match the unit's lessons", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown unit", body = Error),
        (status = 409, description = "Concurrent update", body = Error)
    ),
    tags = ["admin"],
    operation_id = "reorderLessons"
)]
#[put("/admin/units/{id}/lesson-order")]
pub async fn reorder_lessons(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<LessonOrderRequest>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let lessons = state
        .curriculum
        .reorder_lessons(path.into_inner(), payload.into_inner().lesson_ids)
        .await?;
    Ok(HttpResponse::Ok().json(lessons))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/lessons",
    request_body = LessonDraft,
    responses(
        (status = 201, description = "Created", body = Lesson),
        (status = 400, description = "Invalid lesson", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown unit", body = Error),
        (status = 409, description = "Order already used", body = Error)
    ),
    tags = ["admin"],
    operation_id = "createLesson"
)]
#[post("/admin/lessons")]
pub async fn create_lesson(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<LessonDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let lesson = state.curriculum.create_lesson(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(lesson))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson id")),
    request_body = LessonDraft,
    responses(
        (status = 200, description = "Updated", body = Lesson),
        (status = 400, description = "Invalid lesson", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown lesson", body = Error),
        (status = 409, description = "Order already used", body = Error)
    ),
    tags = ["admin"],
    operation_id = "updateLesson"
)]
#[put("/admin/lessons/{id}")]
pub async fn update_lesson(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<LessonDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let lesson = state
        .curriculum
        .update_lesson(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(lesson))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown lesson", body = Error),
        (status = 409, description = "Lesson still has exercises", body = Error)
    ),
    tags = ["admin"],
    operation_id = "deleteLesson"
)]
#[delete("/admin/lessons/{id}")]
pub async fn delete_lesson(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    state.curriculum.delete_lesson(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Exercises of a lesson including their answers.
#[utoipa::path(
    get,
    path = "/api/v1/admin/lessons/{id}/exercises",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Exercises ordered by `order`", body = [Exercise]),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown lesson", body = Error)
    ),
    tags = ["admin"],
    operation_id = "listExercises"
)]
#[get("/admin/lessons/{id}/exercises")]
pub async fn list_exercises(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let exercises = state
        .curriculum_query
        .list_exercises(path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(exercises))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/exercises",
    request_body = ExerciseDraft,
    responses(
        (status = 201, description = "Created", body = Exercise),
        (status = 400, description = "Invalid exercise", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown lesson", body = Error),
        (status = 409, description = "Order already used", body = Error)
    ),
    tags = ["admin"],
    operation_id = "createExercise"
)]
#[post("/admin/exercises")]
pub async fn create_exercise(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<ExerciseDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let exercise = state.curriculum.create_exercise(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(exercise))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/exercises/{id}",
    params(("id" = Uuid, Path, description = "Exercise id")),
    request_body = ExerciseDraft,
    responses(
        (status = 200, description = "Updated", body = Exercise),
        (status = 400, description = "Invalid exercise", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown exercise", body = Error),
        (status = 409, description = "Order already used", body = Error)
    ),
    tags = ["admin"],
    operation_id = "updateExercise"
)]
#[put("/admin/exercises/{id}")]
pub async fn update_exercise(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<ExerciseDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let exercise = state
        .curriculum
        .update_exercise(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(exercise))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/exercises/{id}",
    params(("id" = Uuid, Path, description = "Exercise id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown exercise", body = Error)
    ),
    tags = ["admin"],
    operation_id = "deleteExercise"
)]
#[delete("/admin/exercises/{id}")]
pub async fn delete_exercise(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    state.curriculum.delete_exercise(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Register the curriculum routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_languages)
        .service(get_course_tree)
        .service(get_lesson)
        .service(admin_list_languages)
        .service(create_language)
        .service(get_language)
        .service(update_language)
        .service(delete_language)
        .service(list_chapters)
        .service(create_chapter)
        .service(update_chapter)
        .service(delete_chapter)
        .service(list_units)
        .service(create_unit)
        .service(update_unit)
        .service(delete_unit)
        .service(list_lessons)
        .service(reorder_lessons)
        .service(create_lesson)
        .service(update_lesson)
        .service(delete_lesson)
        .service(list_exercises)
        .service(create_exercise)
        .service(update_exercise)
        .service(delete_exercise);
}

#[cfg(test)]
#[path = "curriculum_tests.rs"]
mod tests;
