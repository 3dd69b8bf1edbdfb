//! Driving ports for quests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::quests::{Quest, QuestDraft, QuestMetric, QuestStats, UserQuestView};
use crate::domain::user::{User, UserProgress};

/// Admin authoring of quest definitions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestCommand: Send + Sync {
    async fn create_quest(&self, draft: QuestDraft) -> Result<Quest, Error>;
    async fn update_quest(&self, id: Uuid, draft: QuestDraft) -> Result<Quest, Error>;
    /// Fails with a conflict while any learner holds the quest.
    async fn delete_quest(&self, id: Uuid) -> Result<(), Error>;
}

/// Admin read access to quests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestQuery: Send + Sync {
    async fn list_quests(&self) -> Result<Vec<Quest>, Error>;
    async fn get_quest(&self, id: Uuid) -> Result<Quest, Error>;
    async fn quest_stats(&self, id: Uuid) -> Result<QuestStats, Error>;
}

/// Outcome of claiming a quest reward.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimOutcome {
    pub quest: UserQuestView,
    pub progress: UserProgress,
}

/// Learner-facing quest lifecycle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserQuestCommand: Send + Sync {
    /// Expire stale quests, assign newly open ones, and list the caller's
    /// quests.
    async fn list_my_quests(&self, user: &User) -> Result<Vec<UserQuestView>, Error>;
    async fn start_quest(&self, user: &User, user_quest_id: Uuid) -> Result<UserQuestView, Error>;
    async fn abandon_quest(&self, user: &User, user_quest_id: Uuid)
    -> Result<UserQuestView, Error>;
    async fn claim_reward(&self, user: &User, user_quest_id: Uuid) -> Result<ClaimOutcome, Error>;
}

/// Sink for learner activity that advances quest conditions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestEvents: Send + Sync {
    /// Count `amount` of `metric` towards the user's running quests.
    async fn record_event(&self, user_id: Uuid, metric: QuestMetric, amount: u64)
    -> Result<(), Error>;
}

/// Quest events sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpQuestEvents;

#[async_trait]
impl QuestEvents for NoOpQuestEvents {
    async fn record_event(
        &self,
        _user_id: Uuid,
        _metric: QuestMetric,
        _amount: u64,
    ) -> Result<(), Error> {
        Ok(())
    }
}
