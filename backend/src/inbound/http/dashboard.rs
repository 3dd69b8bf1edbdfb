//! Admin dashboard handler.

use actix_web::{HttpResponse, get, web};

use crate::domain::Error;
use crate::domain::ports::DashboardTotals;
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthContext;
use crate::inbound::http::state::HttpState;

/// Platform-wide counters and net revenue per currency.
#[utoipa::path(
    get,
    path = "/api/v1/admin/dashboard",
    responses(
        (status = 200, description = "Dashboard totals", body = DashboardTotals),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Administrator role required", body = Error)
    ),
    tags = ["admin"],
    operation_id = "getDashboard"
)]
#[get("/admin/dashboard")]
pub async fn get_dashboard(
    state: web::Data<HttpState>,
    auth: AuthContext,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let totals = state.dashboard.totals().await?;
    Ok(HttpResponse::Ok().json(totals))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_dashboard);
}
