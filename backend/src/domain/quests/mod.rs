//! Time-boxed quests and the per-user quest state machine.
//!
//! A [`Quest`] is authored by admins and describes what to achieve
//! ([`QuestCondition`]) and what is paid out ([`QuestReward`]). Each learner
//! holds at most one [`UserQuest`] per quest, which tracks condition progress
//! and moves through the [`UserQuestStatus`] lifecycle.

mod user_quest;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Error;
use super::ports::Entity;

pub use user_quest::{
    ConditionProgress, QuestTransition, TransitionError, UserQuest, UserQuestStatus,
};

/// Cadence of a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestKind {
    Daily,
    Weekly,
    Event,
}

/// Learner activity counted towards quest conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestMetric {
    LessonsCompleted,
    XpEarned,
    PerfectLessons,
    StreakDays,
    ItemsPurchased,
}

impl QuestMetric {
    /// Absolute metrics report a current value instead of an increment.
    pub fn is_absolute(self) -> bool {
        matches!(self, Self::StreakDays)
    }
}

/// One goal of a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestCondition {
    pub metric: QuestMetric,
    pub target: u64,
}

/// What a reward pays into the learner's wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Xp,
    Coins,
    Hearts,
    StreakFreeze,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestReward {
    pub kind: RewardKind,
    pub amount: u64,
}

/// A quest definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: QuestKind,
    pub conditions: Vec<QuestCondition>,
    #[serde(default)]
    pub rewards: Vec<QuestReward>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub active: bool,
}

impl Quest {
    /// Whether learners can be assigned this quest at `now`.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.active && self.starts_at <= now && now < self.ends_at
    }
}

impl Entity for Quest {
    const COLLECTION: &'static str = "quests";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Create or replace payload for a [`Quest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: QuestKind,
    pub conditions: Vec<QuestCondition>,
    #[serde(default)]
    pub rewards: Vec<QuestReward>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl QuestDraft {
    /// Validate into a quest with the given id.
    pub fn into_quest(self, id: Uuid) -> Result<Quest, Error> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::invalid_field(
                "title",
                "required",
                "title must not be empty",
            ));
        }
        if self.conditions.is_empty() {
            return Err(Error::invalid_field(
                "conditions",
                "required",
                "a quest needs at least one condition",
            ));
        }
        let mut metrics = HashSet::new();
        for condition in &self.conditions {
            if condition.target == 0 {
                return Err(Error::invalid_field(
                    "conditions",
                    "out_of_range",
                    "condition targets must be positive",
                ));
            }
            if !metrics.insert(condition.metric) {
                return Err(Error::invalid_field(
                    "conditions",
                    "duplicate_metric",
                    "each metric may appear in one condition only",
                ));
            }
        }
        if self.rewards.iter().any(|reward| reward.amount == 0) {
            return Err(Error::invalid_field(
                "rewards",
                "out_of_range",
                "reward amounts must be positive",
            ));
        }
        if self.starts_at >= self.ends_at {
            return Err(Error::invalid_field(
                "endsAt",
                "invalid_window",
                "endsAt must be after startsAt",
            ));
        }
        Ok(Quest {
            id,
            title: title.to_owned(),
            description: self
                .description
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty()),
            kind: self.kind,
            conditions: self.conditions,
            rewards: self.rewards,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            active: self.active,
        })
    }
}

/// Per-quest lifecycle counters for admins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestStats {
    pub quest_id: Uuid,
    pub assigned: u64,
    pub started: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub expired: u64,
    pub abandoned: u64,
    pub rewards_claimed: u64,
}

impl QuestStats {
    /// Tally user quests of one quest.
    pub fn tally<'a>(quest_id: Uuid, user_quests: impl IntoIterator<Item = &'a UserQuest>) -> Self {
        let mut stats = Self {
            quest_id,
            ..Self::default()
        };
        for user_quest in user_quests {
            match user_quest.status {
                UserQuestStatus::Assigned => stats.assigned += 1,
                UserQuestStatus::Started => stats.started += 1,
                UserQuestStatus::InProgress => stats.in_progress += 1,
                UserQuestStatus::Completed => stats.completed += 1,
                UserQuestStatus::Expired => stats.expired += 1,
                UserQuestStatus::Abandoned => stats.abandoned += 1,
            }
            if user_quest.reward_claimed_at.is_some() {
                stats.rewards_claimed += 1;
            }
        }
        stats
    }
}

/// A learner's quest joined with its definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserQuestView {
    pub user_quest: UserQuest,
    pub quest: Quest,
    pub percent_complete: u8,
}

impl UserQuestView {
    pub fn new(user_quest: UserQuest, quest: Quest) -> Self {
        Self {
            percent_complete: user_quest.percent_complete(),
            user_quest,
            quest,
        }
    }
}
