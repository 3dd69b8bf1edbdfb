//! Account handlers for learners and administrators.
//!
//! ```text
//! GET    /api/v1/me
//! PATCH  /api/v1/me
//! GET    /api/v1/admin/users?role=&limit=&cursor=
//! GET    /api/v1/admin/users/{id}
//! PATCH  /api/v1/admin/users/{id}
//! POST   /api/v1/admin/users/{id}/wallet
//! DELETE /api/v1/admin/users/{id}
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::ports::AccountView;
use crate::domain::user::{Role, User, UserProgress, WalletAdjustment};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthContext;
use crate::inbound::http::pagination::PageParams;
use crate::inbound::http::schemas::UserPage;
use crate::inbound::http::state::HttpState;

/// Body of a display name change.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisplayNameRequest {
    #[schema(example = "Ada")]
    pub display_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleFilter {
    pub role: Option<Role>,
}

/// The caller with their progress.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Current account", body = AccountView),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["users"],
    operation_id = "getMe"
)]
#[get("/me")]
pub async fn get_me(state: web::Data<HttpState>, auth: AuthContext) -> ApiResult<HttpResponse> {
    let view = state.accounts_query.me(auth.user()).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Rename the caller.
#[utoipa::path(
    patch,
    path = "/api/v1/me",
    request_body = DisplayNameRequest,
    responses(
        (status = 200, description = "Updated account", body = User),
        (status = 400, description = "Invalid display name", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["users"],
    operation_id = "updateMe"
)]
#[patch("/me")]
pub async fn update_me(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<DisplayNameRequest>,
) -> ApiResult<HttpResponse> {
    let user = state
        .accounts
        .update_display_name(auth.user().id, payload.into_inner().display_name)
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

/// List accounts, optionally by role.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(
        ("role" = Option<Role>, Query, description = "Only users with this role"),
        ("limit" = Option<usize>, Query, description = "Page size, default 20, max 100"),
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page")
    ),
    responses(
        (status = 200, description = "Users", body = UserPage),
        (status = 400, description = "Invalid query", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "listUsers"
)]
#[get("/admin/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    auth: AuthContext,
    filter: web::Query<RoleFilter>,
    page: web::Query<PageParams>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let page = page.page_request()?;
    let users = state.accounts_query.list_users(filter.role, page).await?;
    Ok(HttpResponse::Ok().json(users))
}

/// One account with its progress.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Account", body = AccountView),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown user", body = Error)
    ),
    tags = ["admin"],
    operation_id = "getUser"
)]
#[get("/admin/users/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let view = state.accounts_query.get_user(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Rename any account.
#[utoipa::path(
    patch,
    path = "/api/v1/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = DisplayNameRequest,
    responses(
        (status = 200, description = "Updated account", body = User),
        (status = 400, description = "Invalid display name", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown user", body = Error)
    ),
    tags = ["admin"],
    operation_id = "updateUser"
)]
#[patch("/admin/users/{id}")]
pub async fn update_user(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<DisplayNameRequest>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let user = state
        .accounts
        .update_display_name(path.into_inner(), payload.into_inner().display_name)
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Apply signed XP, coin and heart deltas.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/wallet",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = WalletAdjustment,
    responses(
        (status = 200, description = "Updated progress", body = UserProgress),
        (status = 400, description = "Balance would go negative", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown user", body = Error),
        (status = 409, description = "Concurrent update", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adjustWallet"
)]
#[post("/admin/users/{id}/wallet")]
pub async fn adjust_wallet(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<WalletAdjustment>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let progress = state
        .accounts
        .adjust_wallet(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(progress))
}

/// Remove an account with its progress, quests and purchases.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown user", body = Error)
    ),
    tags = ["admin"],
    operation_id = "deleteUser"
)]
#[delete("/admin/users/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    state.accounts.delete_user(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Register the account routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_me)
        .service(update_me)
        .service(list_users)
        .service(get_user)
        .service(update_user)
        .service(adjust_wallet)
        .service(delete_user);
}
