//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`*Command`, `*Query`) are implemented by the domain
//! services and consumed by the HTTP adapter. Driven ports
//! ([`Repository`], [`IdentityProvider`], [`TextToSpeechSource`]) are
//! implemented by outbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod accounts;
mod billing;
mod curriculum;
mod dashboard;
mod identity_provider;
mod progress;
mod quests;
mod repository;
mod shop;
mod text_to_speech;

pub use accounts::{AccountCommand, AccountQuery, AccountView};
#[cfg(test)]
pub use accounts::{MockAccountCommand, MockAccountQuery};
pub use billing::{BillingAdminCommand, BillingQuery, PaymentCommand};
#[cfg(test)]
pub use billing::{MockBillingAdminCommand, MockBillingQuery, MockPaymentCommand};
pub use curriculum::{CurriculumCommand, CurriculumQuery};
#[cfg(test)]
pub use curriculum::{MockCurriculumCommand, MockCurriculumQuery};
#[cfg(test)]
pub use dashboard::MockDashboardQuery;
pub use dashboard::{DashboardQuery, DashboardTotals, RevenueTotal};
#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{IdentityProvider, IdentityProviderError};
#[cfg(test)]
pub use progress::{MockProgressCommand, MockProgressQuery};
pub use progress::{ProgressCommand, ProgressQuery};
#[cfg(test)]
pub use quests::{MockQuestCommand, MockQuestEvents, MockQuestQuery, MockUserQuestCommand};
pub use quests::{
    ClaimOutcome, NoOpQuestEvents, QuestCommand, QuestEvents, QuestQuery, UserQuestCommand,
};
#[cfg(test)]
pub use repository::MockRepository;
pub use repository::{
    Entity, FixtureRepository, Query, Repositories, Repository, RepositoryError, Versioned,
    map_repository_error,
};
#[cfg(test)]
pub use shop::{MockShopCommand, MockShopQuery};
pub use shop::{ShopCommand, ShopQuery};
#[cfg(test)]
pub use text_to_speech::{MockSpeechCommand, MockTextToSpeechSource};
pub use text_to_speech::{
    FixtureTextToSpeechSource, SpeechCommand, TextToSpeechError, TextToSpeechSource,
};
