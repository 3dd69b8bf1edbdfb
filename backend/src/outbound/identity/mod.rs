//! Identity provider adapters.

mod fixture;
mod jwt;

pub use fixture::{ADMIN_TOKEN, FixtureIdentityProvider, LEARNER_TOKEN};
pub use jwt::{JwtIdentityProvider, JwtKey};
