//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint of the inbound layer. Schemas
//! referenced by request and response bodies are collected from the paths;
//! the error envelope and the page wrappers from
//! [`schemas`](crate::inbound::http::schemas) are listed explicitly.
//!
//! The generated document is served by Swagger UI in debug builds and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use crate::domain::{Error, ErrorCode, User};
use crate::inbound::http::schemas::{InvoicePage, PurchasePage, TransactionPage, UserPage};
use crate::inbound::http::{
    billing, curriculum, dashboard, health, progress, quests, shop, tts, users,
};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        let mut bearer = Http::new(HttpAuthScheme::Bearer);
        bearer.bearer_format = Some("JWT".to_owned());
        bearer.description = Some("Access token issued by the identity provider.".to_owned());
        components.add_security_scheme("BearerAuth", SecurityScheme::Http(bearer));
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Lingo backend API",
        description = "Language courses, learner progress, quests, shop and billing."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerAuth" = [])),
    paths(
        health::ready,
        health::live,
        users::get_me,
        users::update_me,
        users::list_users,
        users::get_user,
        users::update_user,
        users::adjust_wallet,
        users::delete_user,
        curriculum::list_languages,
        curriculum::get_course_tree,
        curriculum::get_lesson,
        curriculum::admin_list_languages,
        curriculum::create_language,
        curriculum::get_language,
        curriculum::update_language,
        curriculum::delete_language,
        curriculum::list_chapters,
        curriculum::create_chapter,
        curriculum::update_chapter,
        curriculum::delete_chapter,
        curriculum::list_units,
        curriculum::create_unit,
        curriculum::update_unit,
        curriculum::delete_unit,
        curriculum::list_lessons,
        curriculum::reorder_lessons,
        curriculum::create_lesson,
        curriculum::update_lesson,
        curriculum::delete_lesson,
        curriculum::list_exercises,
        curriculum::create_exercise,
        curriculum::update_exercise,
        curriculum::delete_exercise,
        progress::get_progress,
        progress::select_course,
        progress::check_answer,
        progress::complete_lesson,
        quests::list_my_quests,
        quests::start_quest,
        quests::abandon_quest,
        quests::claim_reward,
        quests::list_quests,
        quests::create_quest,
        quests::get_quest,
        quests::update_quest,
        quests::delete_quest,
        quests::quest_stats,
        shop::list_categories,
        shop::list_items,
        shop::purchase,
        shop::list_my_purchases,
        shop::admin_list_categories,
        shop::create_category,
        shop::update_category,
        shop::delete_category,
        shop::admin_list_items,
        shop::create_item,
        shop::get_item,
        shop::update_item,
        shop::delete_item,
        shop::admin_list_purchases,
        billing::list_plans,
        billing::validate_promo_code,
        billing::checkout,
        billing::list_my_transactions,
        billing::get_my_transaction,
        billing::list_my_invoices,
        billing::get_my_invoice,
        billing::get_settings,
        billing::update_settings,
        billing::admin_list_plans,
        billing::create_plan,
        billing::get_plan,
        billing::update_plan,
        billing::delete_plan,
        billing::list_promo_codes,
        billing::create_promo_code,
        billing::get_promo_code,
        billing::update_promo_code,
        billing::delete_promo_code,
        billing::admin_list_transactions,
        billing::admin_get_transaction,
        billing::confirm_transaction,
        billing::fail_transaction,
        billing::list_refunds,
        billing::refund_transaction,
        billing::admin_list_invoices,
        billing::admin_get_invoice,
        dashboard::get_dashboard,
        tts::synthesize,
    ),
    components(schemas(
        Error,
        ErrorCode,
        User,
        UserPage,
        PurchasePage,
        TransactionPage,
        InvoicePage
    )),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "users", description = "The signed-in learner's account"),
        (name = "curriculum", description = "Published languages, courses and lessons"),
        (name = "progress", description = "Answers, lesson completion, XP and streaks"),
        (name = "quests", description = "Quest assignment and rewards"),
        (name = "shop", description = "Shop catalogue and purchases"),
        (name = "billing", description = "Subscription plans, checkout and invoices"),
        (name = "tts", description = "Text-to-speech proxy"),
        (name = "admin", description = "Administrative operations")
    )
)]
pub struct ApiDoc;
