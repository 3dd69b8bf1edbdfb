//! Per-user quest progress and its lifecycle.
//!
//! | from                           | transition | to                                  |
//! |--------------------------------|------------|-------------------------------------|
//! | (none)                         | assign     | assigned                            |
//! | assigned                       | start      | started                             |
//! | started, in_progress           | progress   | in_progress, or completed when done |
//! | assigned, started, in_progress | abandon    | abandoned                           |
//! | assigned, started, in_progress | expire     | expired                             |
//! | completed, unclaimed           | claim      | completed, reward claimed           |

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Quest, QuestMetric};
use crate::domain::Error;
use crate::domain::ports::Entity;

/// Lifecycle state of a [`UserQuest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserQuestStatus {
    Assigned,
    Started,
    InProgress,
    Completed,
    Expired,
    Abandoned,
}

impl UserQuestStatus {
    /// Whether the quest can still change through learner activity.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Assigned | Self::Started | Self::InProgress)
    }

    /// Whether activity events count towards the conditions.
    pub fn accepts_progress(self) -> bool {
        matches!(self, Self::Started | Self::InProgress)
    }
}

/// Transitions of the quest lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestTransition {
    Start,
    Progress,
    Abandon,
    Expire,
    Claim,
}

/// A transition that the current status does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub from: UserQuestStatus,
    pub transition: QuestTransition,
    pub reward_claimed: bool,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reward_claimed {
            return write!(f, "quest reward was already claimed");
        }
        write!(f, "cannot {:?} a quest that is {:?}", self.transition, self.from)
    }
}

impl std::error::Error for TransitionError {}

impl From<TransitionError> for Error {
    fn from(value: TransitionError) -> Self {
        Error::conflict(value.to_string()).with_details(json!({
            "code": "invalid_transition",
            "from": value.from,
            "transition": value.transition,
        }))
    }
}

/// Progress towards one condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionProgress {
    pub metric: QuestMetric,
    pub current: u64,
    pub target: u64,
}

impl ConditionProgress {
    pub fn is_met(&self) -> bool {
        self.current >= self.target
    }

    /// Apply an event value; returns whether `current` changed.
    fn apply(&mut self, amount: u64) -> bool {
        let next = if self.metric.is_absolute() {
            self.current.max(amount.min(self.target))
        } else {
            self.current.saturating_add(amount).min(self.target)
        };
        let changed = next != self.current;
        self.current = next;
        changed
    }
}

/// A quest held by one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserQuest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quest_id: Uuid,
    pub status: UserQuestStatus,
    pub progress: Vec<ConditionProgress>,
    pub assigned_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Set when the quest was abandoned or expired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_claimed_at: Option<DateTime<Utc>>,
}

impl Entity for UserQuest {
    const COLLECTION: &'static str = "user_quests";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl UserQuest {
    /// Stable id of a learner's copy of a quest, so a quest is held at most
    /// once per learner.
    pub fn id_for(user_id: Uuid, quest_id: Uuid) -> Uuid {
        Uuid::new_v5(&user_id, quest_id.as_bytes())
    }

    /// Assign `quest` to a learner.
    pub fn assign(quest: &Quest, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Self::id_for(user_id, quest.id),
            user_id,
            quest_id: quest.id,
            status: UserQuestStatus::Assigned,
            progress: quest
                .conditions
                .iter()
                .map(|condition| ConditionProgress {
                    metric: condition.metric,
                    current: 0,
                    target: condition.target,
                })
                .collect(),
            assigned_at: now,
            expires_at: quest.ends_at,
            started_at: None,
            completed_at: None,
            ended_at: None,
            reward_claimed_at: None,
        }
    }

    fn reject(&self, transition: QuestTransition) -> TransitionError {
        TransitionError {
            from: self.status,
            transition,
            reward_claimed: self.reward_claimed_at.is_some(),
        }
    }

    /// `assigned -> started`.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status != UserQuestStatus::Assigned {
            return Err(self.reject(QuestTransition::Start));
        }
        self.status = UserQuestStatus::Started;
        self.started_at = Some(now);
        Ok(())
    }

    /// Count an activity event. Returns whether any condition moved.
    ///
    /// Increments saturate at each target; absolute metrics keep the
    /// maximum seen. The quest completes once every condition is met.
    pub fn record(
        &mut self,
        metric: QuestMetric,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<bool, TransitionError> {
        if !self.status.accepts_progress() {
            return Err(self.reject(QuestTransition::Progress));
        }
        let mut changed = false;
        for condition in self
            .progress
            .iter_mut()
            .filter(|condition| condition.metric == metric)
        {
            changed |= condition.apply(amount);
        }
        if !changed {
            return Ok(false);
        }
        if self.progress.iter().all(ConditionProgress::is_met) {
            self.status = UserQuestStatus::Completed;
            self.completed_at = Some(now);
        } else {
            self.status = UserQuestStatus::InProgress;
        }
        Ok(true)
    }

    /// `assigned | started | in_progress -> abandoned`.
    pub fn abandon(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if !self.status.is_open() {
            return Err(self.reject(QuestTransition::Abandon));
        }
        self.status = UserQuestStatus::Abandoned;
        self.ended_at = Some(now);
        Ok(())
    }

    /// `assigned | started | in_progress -> expired` once `now >= expires_at`.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if !self.status.is_open() || now < self.expires_at {
            return Err(self.reject(QuestTransition::Expire));
        }
        self.status = UserQuestStatus::Expired;
        self.ended_at = Some(now);
        Ok(())
    }

    /// Expire the quest if it is open and past its deadline.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        self.expire(now).is_ok()
    }

    /// Mark the reward of a completed quest as claimed.
    pub fn claim(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status != UserQuestStatus::Completed || self.reward_claimed_at.is_some() {
            return Err(self.reject(QuestTransition::Claim));
        }
        self.reward_claimed_at = Some(now);
        Ok(())
    }

    /// `Σ min(current, target) / Σ target` as an integer percentage.
    pub fn percent_complete(&self) -> u8 {
        let target: u64 = self.progress.iter().map(|condition| condition.target).sum();
        if target == 0 {
            return 0;
        }
        let achieved: u64 = self
            .progress
            .iter()
            .map(|condition| condition.current.min(condition.target))
            .sum();
        u8::try_from(achieved.saturating_mul(100) / target).unwrap_or(100)
    }
}
