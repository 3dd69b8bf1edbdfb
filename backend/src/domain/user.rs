//! Learner accounts and their wallet.
//!
//! A [`User`] is created the first time an identity is seen. Its
//! [`UserProgress`] shares the user's id and carries everything the learning
//! loop mutates: XP, coins, hearts, the daily streak and completed lessons.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Error;
use super::ports::Entity;

/// Maximum number of hearts a learner can hold.
pub const MAX_HEARTS: u32 = 5;

/// Maximum display name length in characters.
pub const DISPLAY_NAME_MAX: usize = 40;

/// Name used when an identity carries no usable display name.
pub const DEFAULT_DISPLAY_NAME: &str = "Learner";

/// Validation errors for user-facing account fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyDisplayName,
    DisplayNameTooLong { max: usize },
    DisplayNameControlCharacters,
    UnknownRole(String),
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDisplayName => write!(f, "display name must not be empty"),
            Self::DisplayNameTooLong { max } => {
                write!(f, "display name must be at most {max} characters")
            }
            Self::DisplayNameControlCharacters => {
                write!(f, "display name must not contain control characters")
            }
            Self::UnknownRole(role) => write!(f, "unknown role: {role}"),
        }
    }
}

impl std::error::Error for UserValidationError {}

impl From<UserValidationError> for Error {
    fn from(error: UserValidationError) -> Self {
        let (field, code) = match &error {
            UserValidationError::EmptyDisplayName => ("displayName", "required"),
            UserValidationError::DisplayNameTooLong { .. } => ("displayName", "too_long"),
            UserValidationError::DisplayNameControlCharacters => {
                ("displayName", "invalid_characters")
            }
            UserValidationError::UnknownRole(_) => ("role", "unknown_role"),
        };
        Self::invalid_field(field, code, error.to_string())
    }
}

/// Access level carried by the identity token.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Learner,
    Admin,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Learner => "learner",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = UserValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "learner" | "user" => Ok(Self::Learner),
            "admin" => Ok(Self::Admin),
            other => Err(UserValidationError::UnknownRole(other.to_owned())),
        }
    }
}

/// Trimmed, non-empty display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Validate and construct a [`DisplayName`].
    ///
    /// # Examples
    /// ```
    /// use lingo::domain::user::DisplayName;
    ///
    /// let name = DisplayName::new("  Ada  ").expect("valid");
    /// assert_eq!(name.as_ref(), "Ada");
    /// assert!(DisplayName::new("   ").is_err());
    /// ```
    pub fn new(value: impl Into<String>) -> Result<Self, UserValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyDisplayName);
        }
        if trimmed.chars().count() > DISPLAY_NAME_MAX {
            return Err(UserValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX,
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(UserValidationError::DisplayNameControlCharacters);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Fallback name for new accounts.
    pub fn default_name() -> Self {
        Self(DEFAULT_DISPLAY_NAME.to_owned())
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Paid access window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub plan_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether the subscription covers `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.started_at <= now && now < self.expires_at
    }
}

/// Platform account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    /// Subject of the identity token.
    pub external_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[schema(value_type = String, example = "Ada")]
    pub display_name: DisplayName,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether the account has admin rights.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether the account holds a subscription covering `now`.
    pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|subscription| subscription.is_active(now))
    }

    /// Admins and subscribers never lose hearts.
    pub fn has_unlimited_hearts(&self, now: DateTime<Utc>) -> bool {
        self.is_admin() || self.has_active_subscription(now)
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Failures applying wallet changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    InsufficientCoins { needed: u64, available: u64 },
    Negative { field: &'static str },
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientCoins { needed, available } => {
                write!(f, "needs {needed} coins but only {available} available")
            }
            Self::Negative { field } => write!(f, "{field} must not become negative"),
        }
    }
}

impl std::error::Error for WalletError {}

impl From<WalletError> for Error {
    fn from(error: WalletError) -> Self {
        match error {
            WalletError::InsufficientCoins { .. } => {
                Self::conflict_with_code("insufficient_coins", error.to_string())
            }
            WalletError::Negative { field } => {
                Self::invalid_field(field, "negative_balance", error.to_string())
            }
        }
    }
}

/// Signed wallet deltas applied by administrators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletAdjustment {
    #[serde(default)]
    pub xp: i64,
    #[serde(default)]
    pub coins: i64,
    #[serde(default)]
    pub hearts: i64,
}

/// Learning state of one user. Shares the user's id.
///
/// ## Invariants
/// - `hearts <= MAX_HEARTS`.
/// - `completed_lessons` holds each lesson at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_language_id: Option<Uuid>,
    pub xp: u64,
    pub coins: u64,
    pub hearts: u32,
    pub streak_days: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_on: Option<NaiveDate>,
    pub streak_freezes: u32,
    #[serde(default)]
    pub completed_lessons: Vec<Uuid>,
}

impl UserProgress {
    /// Fresh progress: full hearts, empty wallet.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: user_id,
            active_language_id: None,
            xp: 0,
            coins: 0,
            hearts: MAX_HEARTS,
            streak_days: 0,
            last_active_on: None,
            streak_freezes: 0,
            completed_lessons: Vec::new(),
        }
    }

    /// Whether `lesson_id` was completed before.
    pub fn has_completed(&self, lesson_id: Uuid) -> bool {
        self.completed_lessons.contains(&lesson_id)
    }

    /// Record a completed lesson once.
    pub fn mark_completed(&mut self, lesson_id: Uuid) {
        if !self.has_completed(lesson_id) {
            self.completed_lessons.push(lesson_id);
        }
    }

    /// Add hearts, saturating at [`MAX_HEARTS`].
    pub fn add_hearts(&mut self, amount: u32) {
        self.hearts = self.hearts.saturating_add(amount).min(MAX_HEARTS);
    }

    /// Deduct coins.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::InsufficientCoins`] and leaves the wallet
    /// untouched when the balance is too low.
    pub fn spend_coins(&mut self, amount: u64) -> Result<(), WalletError> {
        if amount > self.coins {
            return Err(WalletError::InsufficientCoins {
                needed: amount,
                available: self.coins,
            });
        }
        self.coins -= amount;
        Ok(())
    }

    /// Apply signed deltas. Results may not be negative; hearts are capped.
    ///
    /// # Examples
    /// ```
    /// use lingo::domain::user::{UserProgress, WalletAdjustment, MAX_HEARTS};
    /// use uuid::Uuid;
    ///
    /// let mut progress = UserProgress::new(Uuid::new_v4());
    /// progress
    ///     .apply_adjustment(WalletAdjustment { xp: 10, coins: 5, hearts: 3 })
    ///     .expect("adjustment applies");
    /// assert_eq!(progress.coins, 5);
    /// assert_eq!(progress.hearts, MAX_HEARTS);
    /// ```
    pub fn apply_adjustment(&mut self, adjustment: WalletAdjustment) -> Result<(), WalletError> {
        let xp = apply_delta(self.xp, adjustment.xp, "xp")?;
        let coins = apply_delta(self.coins, adjustment.coins, "coins")?;
        let hearts = apply_delta(u64::from(self.hearts), adjustment.hearts, "hearts")?;
        self.xp = xp;
        self.coins = coins;
        self.hearts = u32::try_from(hearts.min(u64::from(MAX_HEARTS))).unwrap_or(MAX_HEARTS);
        Ok(())
    }
}

fn apply_delta(current: u64, delta: i64, field: &'static str) -> Result<u64, WalletError> {
    let magnitude = delta.unsigned_abs();
    if delta >= 0 {
        Ok(current.saturating_add(magnitude))
    } else {
        current
            .checked_sub(magnitude)
            .ok_or(WalletError::Negative { field })
    }
}

impl Entity for UserProgress {
    const COLLECTION: &'static str = "user_progress";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests;
