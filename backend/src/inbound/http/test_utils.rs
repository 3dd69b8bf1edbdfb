//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{App, test as actix_test, web};
use chrono::Utc;
use uuid::Uuid;

use crate::domain::ports::{
    FixtureTextToSpeechSource, MockAccountCommand, MockIdentityProvider, Repositories,
};
use crate::domain::user::{DisplayName, Role};
use crate::domain::{Error, User};
use crate::test_support::MutableClock;

use super::error::request_error_configs;
use super::state::HttpState;

/// Bearer token accepted by [`state_for`].
pub const TOKEN: &str = "test-token";

fn user(role: Role) -> User {
    User {
        id: Uuid::new_v4(),
        external_id: format!("{}-subject", role.as_str()),
        email: None,
        display_name: DisplayName::default_name(),
        role,
        subscription: None,
        created_at: Utc::now(),
    }
}

pub fn learner() -> User {
    user(Role::Learner)
}

pub fn admin() -> User {
    user(Role::Admin)
}

/// Account mock that resolves every identity to `user`.
pub fn resolving_accounts(user: User) -> MockAccountCommand {
    let mut accounts = MockAccountCommand::new();
    accounts
        .expect_resolve()
        .returning(move |_| Ok(user.clone()));
    accounts
}

/// State with fixture repositories where [`TOKEN`] authenticates as `user`.
///
/// Replace individual ports with mocks to drive a handler under test.
pub fn state_for(user: User) -> HttpState {
    let mut identity = MockIdentityProvider::new();
    let role = user.role;
    identity.expect_verify().returning(move |token| {
        if token == TOKEN {
            Ok(crate::domain::auth::Identity::new("test-subject", role))
        } else {
            Err(crate::domain::ports::IdentityProviderError::invalid_token(
                "unknown test token",
            ))
        }
    });
    let mut state = HttpState::from_repositories(
        Repositories::fixtures(),
        Arc::new(identity),
        Arc::new(FixtureTextToSpeechSource),
        Arc::new(MutableClock::new(Utc::now())),
    );
    state.accounts = Arc::new(resolving_accounts(user));
    state
}

/// App with `state`, the request error handlers and `configure` applied.
pub fn app_with(
    state: HttpState,
    configure: impl FnOnce(&mut web::ServiceConfig),
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let (json, path, query) = request_error_configs();
    App::new()
        .app_data(web::Data::new(state))
        .app_data(json)
        .app_data(path)
        .app_data(query)
        .configure(configure)
}

/// Authenticated request builder.
pub fn authed(request: actix_test::TestRequest) -> actix_test::TestRequest {
    request.insert_header((AUTHORIZATION, format!("Bearer {TOKEN}")))
}

/// Decode the JSON error envelope from a response body.
pub fn error_body(bytes: &[u8]) -> Error {
    serde_json::from_slice(bytes).expect("error payload")
}
