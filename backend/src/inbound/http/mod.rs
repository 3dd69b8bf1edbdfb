//! HTTP inbound adapter exposing the REST API.
//!
//! Every handler module registers its routes through a `configure` function
//! relative to the `/api/v1` scope; [`configure_api`] applies them all.

pub mod auth;
pub mod billing;
pub mod curriculum;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod pagination;
pub mod progress;
pub mod quests;
pub mod schemas;
pub mod shop;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod tts;
pub mod users;

use actix_web::web;

pub use error::ApiResult;

/// Register every API route on a `/api/v1` scope.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.configure(users::configure)
        .configure(curriculum::configure)
        .configure(progress::configure)
        .configure(quests::configure)
        .configure(shop::configure)
        .configure(billing::configure)
        .configure(dashboard::configure)
        .configure(tts::configure);
}
