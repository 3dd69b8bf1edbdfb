//! Domain primitives, aggregates and services.
//!
//! Purpose: define the strongly typed entities of the learning platform, the
//! rules that keep them consistent, and the services that implement the
//! driving ports. Nothing in here knows about HTTP or SQL.
//!
//! Public surface:
//! - [`Error`] and [`ErrorCode`]: the error payload shared by every layer.
//! - [`TraceId`]: request correlation id.
//! - `*Service` types implementing the ports in [`ports`].

pub mod auth;
pub mod billing;
pub mod curriculum;
pub mod error;
pub mod ports;
pub mod progress;
pub mod quests;
pub mod shop;
pub mod trace_id;
pub mod tts;
pub mod user;

mod account_service;
mod billing_service;
mod curriculum_service;
mod dashboard_service;
mod lookup;
mod progress_service;
mod quest_service;
mod shop_service;
#[cfg(test)]
mod test_doubles;

pub use self::account_service::{AccountService, user_id_for_subject};
pub use self::billing_service::BillingService;
pub use self::curriculum_service::CurriculumService;
pub use self::dashboard_service::{DashboardService, revenue_by_currency};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::progress_service::ProgressService;
pub use self::quest_service::{QuestService, apply_rewards};
pub use self::shop_service::ShopService;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::tts::SpeechService;
pub use self::user::{User, UserValidationError};

