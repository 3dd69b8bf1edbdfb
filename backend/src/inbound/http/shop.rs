//! Coin shop handlers.
//!
//! ```text
//! GET    /api/v1/shop/categories
//! GET    /api/v1/shop/items?categoryId=
//! POST   /api/v1/shop/items/{id}/purchase
//! GET    /api/v1/shop/purchases?limit=&cursor=
//! GET    /api/v1/admin/shop/categories    POST
//! PUT    /api/v1/admin/shop/categories/{id}    DELETE
//! GET    /api/v1/admin/shop/items?categoryId=  POST
//! GET    /api/v1/admin/shop/items/{id}    PUT, DELETE
//! GET    /api/v1/admin/shop/purchases?userId=&limit=&cursor=
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::shop::{
    PurchaseReceipt, ShopCategory, ShopCategoryDraft, ShopItem, ShopItemDraft,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthContext;
use crate::inbound::http::pagination::PageParams;
use crate::inbound::http::schemas::PurchasePage;
use crate::inbound::http::state::HttpState;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    /// Units to buy, 1 when omitted.
    #[serde(default = "one")]
    #[schema(example = 1)]
    pub quantity: u64,
}

fn one() -> u64 {
    1
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFilter {
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerFilter {
    pub user_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/v1/shop/categories",
    responses(
        (status = 200, description = "Categories in display order", body = [ShopCategory]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["shop"],
    operation_id = "listShopCategories"
)]
#[get("/shop/categories")]
pub async fn list_categories(
    state: web::Data<HttpState>,
    _auth: AuthContext,
) -> ApiResult<HttpResponse> {
    let categories = state.shop_query.list_categories().await?;
    Ok(HttpResponse::Ok().json(categories))
}

/// Items currently for sale.
#[utoipa::path(
    get,
    path = "/api/v1/shop/items",
    params(("categoryId" = Option<Uuid>, Query, description = "Only items in this category")),
    responses(
        (status = 200, description = "Active items", body = [ShopItem]),
        (status = 400, description = "Invalid query", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["shop"],
    operation_id = "listShopItems"
)]
#[get("/shop/items")]
pub async fn list_items(
    state: web::Data<HttpState>,
    _auth: AuthContext,
    filter: web::Query<CategoryFilter>,
) -> ApiResult<HttpResponse> {
    let items = state.shop_query.list_items(filter.category_id, false).await?;
    Ok(HttpResponse::Ok().json(items))
}

/// Spend coins on an item.
#[utoipa::path(
    post,
    path = "/api/v1/shop/items/{id}/purchase",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = PurchaseRequest,
    responses(
        (status = 200, description = "Purchase completed", body = PurchaseReceipt),
        (status = 400, description = "Quantity out of range", body = Error),
        (status = 404, description = "Unknown item", body = Error),
        (status = 409, description = "Insufficient coins, stock or limit", body = Error)
    ),
    tags = ["shop"],
    operation_id = "purchaseItem"
)]
#[post("/shop/items/{id}/purchase")]
pub async fn purchase(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<PurchaseRequest>,
) -> ApiResult<HttpResponse> {
    let receipt = state
        .shop
        .purchase(auth.user(), path.into_inner(), payload.quantity)
        .await?;
    Ok(HttpResponse::Ok().json(receipt))
}

#[utoipa::path(
    get,
    path = "/api/v1/shop/purchases",
    params(
        ("limit" = Option<usize>, Query, description = "Page size, default 20, max 100"),
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page")
    ),
    responses(
        (status = 200, description = "Caller's purchases", body = PurchasePage),
        (status = 400, description = "Invalid query", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["shop"],
    operation_id = "listMyPurchases"
)]
#[get("/shop/purchases")]
pub async fn list_my_purchases(
    state: web::Data<HttpState>,
    auth: AuthContext,
    page: web::Query<PageParams>,
) -> ApiResult<HttpResponse> {
    let page = page.page_request()?;
    let purchases = state
        .shop_query
        .list_purchases(Some(auth.user().id), page)
        .await?;
    Ok(HttpResponse::Ok().json(purchases))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/shop/categories",
    responses(
        (status = 200, description = "Categories", body = [ShopCategory]),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminListShopCategories"
)]
#[get("/admin/shop/categories")]
pub async fn admin_list_categories(
    state: web::Data<HttpState>,
    auth: AuthContext,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let categories = state.shop_query.list_categories().await?;
    Ok(HttpResponse::Ok().json(categories))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/shop/categories",
    request_body = ShopCategoryDraft,
    responses(
        (status = 201, description = "Created", body = ShopCategory),
        (status = 400, description = "Invalid category", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 409, description = "Slug already used", body = Error)
    ),
    tags = ["admin"],
    operation_id = "createShopCategory"
)]
#[post("/admin/shop/categories")]
pub async fn create_category(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<ShopCategoryDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let category = state.shop.create_category(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(category))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/shop/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = ShopCategoryDraft,
    responses(
        (status = 200, description = "Updated", body = ShopCategory),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown category", body = Error),
        (status = 409, description = "Slug already used", body = Error)
    ),
    tags = ["admin"],
    operation_id = "updateShopCategory"
)]
#[put("/admin/shop/categories/{id}")]
pub async fn update_category(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<ShopCategoryDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let category = state
        .shop
        .update_category(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(category))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/shop/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown category", body = Error),
        (status = 409, description = "Category still has items", body = Error)
    ),
    tags = ["admin"],
    operation_id = "deleteShopCategory"
)]
#[delete("/admin/shop/categories/{id}")]
pub async fn delete_category(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    state.shop.delete_category(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// All items, including those withdrawn from sale.
#[utoipa::path(
    get,
    path = "/api/v1/admin/shop/items",
    params(("categoryId" = Option<Uuid>, Query, description = "Only items in this category")),
    responses(
        (status = 200, description = "Items", body = [ShopItem]),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminListShopItems"
)]
#[get("/admin/shop/items")]
pub async fn admin_list_items(
    state: web::Data<HttpState>,
    auth: AuthContext,
    filter: web::Query<CategoryFilter>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let items = state.shop_query.list_items(filter.category_id, true).await?;
    Ok(HttpResponse::Ok().json(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/shop/items",
    request_body = ShopItemDraft,
    responses(
        (status = 201, description = "Created", body = ShopItem),
        (status = 400, description = "Invalid item", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown category", body = Error)
    ),
    tags = ["admin"],
    operation_id = "createShopItem"
)]
#[post("/admin/shop/items")]
pub async fn create_item(
    state: web::Data<HttpState>,
    auth: AuthContext,
    payload: web::Json<ShopItemDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let item = state.shop.create_item(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(item))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/shop/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item", body = ShopItem),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown item", body = Error)
    ),
    tags = ["admin"],
    operation_id = "getShopItem"
)]
#[get("/admin/shop/items/{id}")]
pub async fn get_item(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let item = state.shop_query.get_item(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(item))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/shop/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    request_body = ShopItemDraft,
    responses(
        (status = 200, description = "Updated", body = ShopItem),
        (status = 400, description = "Invalid item", body = Error),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown item or category", body = Error)
    ),
    tags = ["admin"],
    operation_id = "updateShopItem"
)]
#[put("/admin/shop/items/{id}")]
pub async fn update_item(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
    payload: web::Json<ShopItemDraft>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let item = state
        .shop
        .update_item(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(item))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/shop/items/{id}",
    params(("id" = Uuid, Path, description = "Item id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrator role required", body = Error),
        (status = 404, description = "Unknown item", body = Error)
    ),
    tags = ["admin"],
    operation_id = "deleteShopItem"
)]
#[delete("/admin/shop/items/{id}")]
pub async fn delete_item(
    state: web::Data<HttpState>,
    auth: AuthContext,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    state.shop.delete_item(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Purchase ledger across learners.
#[utoipa::path(
    get,
    path = "/api/v1/admin/shop/purchases",
    params(
        ("userId" = Option<Uuid>, Query, description = "Only purchases by this user"),
        ("limit" = Option<usize>, Query, description = "Page size, default 20, max 100"),
        ("cursor" = Option<String>, Query, description = "Opaque cursor from a previous page")
    ),
    responses(
        (status = 200, description = "Purchases", body = PurchasePage),
        (status = 400, description = "Invalid query", body = Error),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminListPurchases"
)]
#[get("/admin/shop/purchases")]
pub async fn admin_list_purchases(
    state: web::Data<HttpState>,
    auth: AuthContext,
    filter: web::Query<BuyerFilter>,
    page: web::Query<PageParams>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let page = page.page_request()?;
    let purchases = state.shop_query.list_purchases(filter.user_id, page).await?;
    Ok(HttpResponse::Ok().json(purchases))
}

/// Register the shop routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_categories)
        .service(list_items)
        .service(purchase)
        .service(list_my_purchases)
        .service(admin_list_categories)
        .service(create_category)
        .service(update_category)
        .service(delete_category)
        .service(admin_list_items)
        .service(create_item)
        .service(get_item)
        .service(update_item)
        .service(delete_item)
        .service(admin_list_purchases);
}
