//! Quest authoring, assignment, progress and reward claiming.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::Error;
use super::lookup::{
    delete, ensure_no_children, find_values, insert, replace, require, update_progress,
};
use super::ports::{
    ClaimOutcome, QuestCommand, QuestEvents, QuestQuery, Query, Repositories, RepositoryError,
    UserQuestCommand, Versioned, map_repository_error,
};
use super::quests::{
    Quest, QuestDraft, QuestMetric, QuestReward, QuestStats, RewardKind, UserQuest,
    UserQuestView,
};
use super::user::{User, UserProgress};

/// Quest service over the quest and progress repositories.
#[derive(Clone)]
pub struct QuestService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

/// Pay quest rewards into a learner's wallet.
pub fn apply_rewards(progress: &mut UserProgress, rewards: &[QuestReward]) {
    for reward in rewards {
        match reward.kind {
            RewardKind::Xp => progress.xp = progress.xp.saturating_add(reward.amount),
            RewardKind::Coins => progress.coins = progress.coins.saturating_add(reward.amount),
            RewardKind::Hearts => {
                progress.add_hearts(u32::try_from(reward.amount).unwrap_or(u32::MAX));
            }
            RewardKind::StreakFreeze => {
                let amount = u32::try_from(reward.amount).unwrap_or(u32::MAX);
                progress.streak_freezes = progress.streak_freezes.saturating_add(amount);
            }
        }
    }
}

impl QuestService {
    /// Create a service using `clock` for deadlines and timestamps.
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }

    async fn owned_user_quest(
        &self,
        user: &User,
        user_quest_id: Uuid,
    ) -> Result<Versioned<UserQuest>, Error> {
        let stored = require(self.repos.user_quests.as_ref(), user_quest_id, "quest").await?;
        if stored.value.user_id != user.id {
            return Err(Error::not_found(format!("quest {user_quest_id} not found")));
        }
        Ok(stored)
    }

    /// Persist an expiry that became due before acting on the quest.
    async fn settle_expiry(
        &self,
        mut stored: Versioned<UserQuest>,
    ) -> Result<Versioned<UserQuest>, Error> {
        if stored.value.expire_if_due(self.clock.utc()) {
            info!(user_quest_id = %stored.value.id, "quest expired");
            stored = replace(self.repos.user_quests.as_ref(), stored).await?;
        }
        Ok(stored)
    }

    /// Clear a claim marker whose rewards were never paid.
    async fn release_claim(&self, mut claimed: Versioned<UserQuest>) {
        let user_quest_id = claimed.value.id;
        claimed.value.reward_claimed_at = None;
        match replace(self.repos.user_quests.as_ref(), claimed).await {
            Ok(_) => warn!(%user_quest_id, "quest rewards not paid, claim released"),
            Err(error) => {
                error!(%user_quest_id, error = %error, "claim marker stuck without payout");
            }
        }
    }

    /// Hand out `quest`, reusing the copy a concurrent request already stored.
    async fn assign(
        &self,
        quest: &Quest,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<UserQuest, Error> {
        let user_quest = UserQuest::assign(quest, user_id, now);
        let id = user_quest.id;
        match self.repos.user_quests.insert(user_quest).await {
            Ok(stored) => {
                info!(%user_id, quest_id = %quest.id, "quest assigned");
                Ok(stored.value)
            }
            Err(RepositoryError::Duplicate { .. }) => {
                require(self.repos.user_quests.as_ref(), id, "quest")
                    .await
                    .map(Versioned::into_inner)
            }
            Err(error) => Err(map_repository_error(error)),
        }
    }

    async fn view(&self, user_quest: UserQuest) -> Result<UserQuestView, Error> {
        let quest = require(self.repos.quests.as_ref(), user_quest.quest_id, "quest")
            .await?
            .into_inner();
        Ok(UserQuestView::new(user_quest, quest))
    }
}

#[async_trait]
impl QuestCommand for QuestService {
    async fn create_quest(&self, draft: QuestDraft) -> Result<Quest, Error> {
        let quest = draft.into_quest(Uuid::new_v4())?;
        let quest = insert(self.repos.quests.as_ref(), quest).await?;
        info!(quest_id = %quest.id, kind = ?quest.kind, "quest created");
        Ok(quest)
    }

    async fn update_quest(&self, id: Uuid, draft: QuestDraft) -> Result<Quest, Error> {
        let current = require(self.repos.quests.as_ref(), id, "quest").await?;
        let quest = draft.into_quest(id)?;
        replace(
            self.repos.quests.as_ref(),
            Versioned::new(quest, current.revision),
        )
        .await
        .map(Versioned::into_inner)
    }

    async fn delete_quest(&self, id: Uuid) -> Result<(), Error> {
        require(self.repos.quests.as_ref(), id, "quest").await?;
        ensure_no_children(
            self.repos.user_quests.as_ref(),
            &Query::all().eq("questId", id),
            "quest",
        )
        .await?;
        delete(self.repos.quests.as_ref(), id, "quest").await?;
        info!(quest_id = %id, "quest deleted");
        Ok(())
    }
}

#[async_trait]
impl QuestQuery for QuestService {
    async fn list_quests(&self) -> Result<Vec<Quest>, Error> {
        let mut quests = find_values(self.repos.quests.as_ref(), &Query::all()).await?;
        quests.sort_by_key(|quest| quest.starts_at);
        Ok(quests)
    }

    async fn get_quest(&self, id: Uuid) -> Result<Quest, Error> {
        require(self.repos.quests.as_ref(), id, "quest")
            .await
            .map(Versioned::into_inner)
    }

    async fn quest_stats(&self, id: Uuid) -> Result<QuestStats, Error> {
        require(self.repos.quests.as_ref(), id, "quest").await?;
        let user_quests = find_values(
            self.repos.user_quests.as_ref(),
            &Query::all().eq("questId", id),
        )
        .await?;
        Ok(QuestStats::tally(id, &user_quests))
    }
}

#[async_trait]
impl UserQuestCommand for QuestService {
    async fn list_my_quests(&self, user: &User) -> Result<Vec<UserQuestView>, Error> {
        let now = self.clock.utc();
        let held = self
            .repos
            .user_quests
            .find(&Query::all().eq("userId", user.id))
            .await
            .map_err(map_repository_error)?;

        let mut user_quests = Vec::with_capacity(held.len());
        for stored in held {
            user_quests.push(self.settle_expiry(stored).await?.into_inner());
        }

        let quests: HashMap<Uuid, Quest> =
            find_values(self.repos.quests.as_ref(), &Query::all().eq("active", true))
                .await?
                .into_iter()
                .map(|quest| (quest.id, quest))
                .collect();
        let held_ids: HashSet<Uuid> = user_quests.iter().map(|uq| uq.quest_id).collect();
        for quest in quests.values().filter(|quest| quest.is_open(now)) {
            if held_ids.contains(&quest.id) {
                continue;
            }
            user_quests.push(self.assign(quest, user.id, now).await?);
        }

        let mut views = Vec::with_capacity(user_quests.len());
        for user_quest in user_quests {
            match quests.get(&user_quest.quest_id) {
                Some(quest) => views.push(UserQuestView::new(user_quest, quest.clone())),
                None => views.push(self.view(user_quest).await?),
            }
        }
        views.sort_by_key(|view| (view.user_quest.expires_at, view.user_quest.assigned_at));
        Ok(views)
    }

    async fn start_quest(&self, user: &User, user_quest_id: Uuid) -> Result<UserQuestView, Error> {
        let mut stored = self
            .settle_expiry(self.owned_user_quest(user, user_quest_id).await?)
            .await?;
        stored.value.start(self.clock.utc())?;
        let stored = replace(self.repos.user_quests.as_ref(), stored).await?;
        info!(user_id = %user.id, %user_quest_id, "quest started");
        self.view(stored.value).await
    }

    async fn abandon_quest(
        &self,
        user: &User,
        user_quest_id: Uuid,
    ) -> Result<UserQuestView, Error> {
        let mut stored = self
            .settle_expiry(self.owned_user_quest(user, user_quest_id).await?)
            .await?;
        stored.value.abandon(self.clock.utc())?;
        let stored = replace(self.repos.user_quests.as_ref(), stored).await?;
        info!(user_id = %user.id, %user_quest_id, "quest abandoned");
        self.view(stored.value).await
    }

    async fn claim_reward(&self, user: &User, user_quest_id: Uuid) -> Result<ClaimOutcome, Error> {
        let mut stored = self.owned_user_quest(user, user_quest_id).await?;
        let quest = require(self.repos.quests.as_ref(), stored.value.quest_id, "quest")
            .await?
            .into_inner();
        stored.value.claim(self.clock.utc())?;
        // Claim marker goes first; a racing second claim then fails on revision.
        let stored = replace(self.repos.user_quests.as_ref(), stored).await?;
        let paid = update_progress(self.repos.progress.as_ref(), user.id, |progress| {
            apply_rewards(progress, &quest.rewards);
            Ok(())
        })
        .await;
        let progress = match paid {
            Ok(progress) => progress,
            Err(error) => {
                self.release_claim(stored).await;
                return Err(error);
            }
        };
        info!(user_id = %user.id, %user_quest_id, "quest reward claimed");
        Ok(ClaimOutcome {
            quest: UserQuestView::new(stored.value, quest),
            progress,
        })
    }
}

#[async_trait]
impl QuestEvents for QuestService {
    async fn record_event(
        &self,
        user_id: Uuid,
        metric: QuestMetric,
        amount: u64,
    ) -> Result<(), Error> {
        let now = self.clock.utc();
        let running = self
            .repos
            .user_quests
            .find(&Query::all().eq("userId", user_id))
            .await
            .map_err(map_repository_error)?;
        for mut stored in running
            .into_iter()
            .filter(|stored| stored.value.status.accepts_progress())
        {
            if stored.value.expire_if_due(now) {
                replace(self.repos.user_quests.as_ref(), stored).await?;
                continue;
            }
            let changed = stored.value.record(metric, amount, now)?;
            if !changed {
                continue;
            }
            let user_quest_id = stored.value.id;
            let status = stored.value.status;
            if let Err(error) = replace(self.repos.user_quests.as_ref(), stored).await {
                warn!(%user_id, %user_quest_id, error = %error, "quest progress not saved");
                continue;
            }
            info!(%user_id, %user_quest_id, ?metric, ?status, "quest progress recorded");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::quests::{QuestCondition, QuestKind, UserQuestStatus};
    use crate::domain::test_doubles::{FailReplace, StoredRepository};
    use crate::domain::user::{DisplayName, MAX_HEARTS, Role};
    use crate::test_support::MutableClock;
    use chrono::{TimeDelta, TimeZone};
    use rstest::{fixture, rstest};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 6, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[fixture]
    fn learner() -> User {
        User {
            id: Uuid::new_v4(),
            external_id: "sub".to_owned(),
            email: None,
            display_name: DisplayName::default_name(),
            role: Role::Learner,
            subscription: None,
            created_at: now(),
        }
    }

    #[fixture]
    fn quest() -> Quest {
        Quest {
            id: Uuid::new_v4(),
            title: "Warm up".to_owned(),
            description: None,
            kind: QuestKind::Daily,
            conditions: vec![QuestCondition {
                metric: QuestMetric::LessonsCompleted,
                target: 1,
            }],
            rewards: vec![QuestReward {
                kind: RewardKind::Coins,
                amount: 15,
            }],
            starts_at: now() - TimeDelta::hours(1),
            ends_at: now() + TimeDelta::days(1),
            active: true,
        }
    }

    fn service(repos: Repositories) -> QuestService {
        QuestService::new(repos, Arc::new(MutableClock::new(now())))
    }

    #[rstest]
    #[tokio::test]
    async fn failed_payout_leaves_the_reward_claimable(learner: User, quest: Quest) {
        let mut completed = UserQuest::assign(&quest, learner.id, now());
        completed.start(now()).expect("start");
        completed
            .record(QuestMetric::LessonsCompleted, 1, now())
            .expect("progress");
        assert_eq!(completed.status, UserQuestStatus::Completed);
        let user_quest_id = completed.id;

        let user_quests = Arc::new(StoredRepository::with([completed]));
        let progress = Arc::new(StoredRepository::with([UserProgress::new(learner.id)]));
        progress.fail_replace(FailReplace::Call(1));
        let mut repos = Repositories::fixtures();
        repos.quests = Arc::new(StoredRepository::with([quest]));
        repos.user_quests = user_quests.clone();
        repos.progress = progress.clone();
        let service = service(repos);

        let err = service
            .claim_reward(&learner, user_quest_id)
            .await
            .expect_err("progress write fails");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
        let stored = user_quests.value(user_quest_id).expect("user quest");
        assert!(stored.reward_claimed_at.is_none());

        let outcome = service
            .claim_reward(&learner, user_quest_id)
            .await
            .expect("retry pays out");
        assert_eq!(outcome.progress.coins, 15);
        assert!(outcome.quest.user_quest.reward_claimed_at.is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn assignment_reuses_a_copy_stored_by_a_concurrent_request(
        learner: User,
        quest: Quest,
    ) {
        let racing = UserQuest::assign(&quest, learner.id, now());
        let user_quests = Arc::new(StoredRepository::with([racing.clone()]));
        let mut repos = Repositories::fixtures();
        repos.user_quests = user_quests.clone();

        let assigned = service(repos)
            .assign(&quest, learner.id, now())
            .await
            .expect("duplicate resolves to the stored copy");
        assert_eq!(assigned, racing);
        assert_eq!(user_quests.values().len(), 1);
    }

    #[rstest]
    fn rewards_credit_wallet_and_cap_hearts() {
        let mut progress = UserProgress::new(Uuid::new_v4());
        progress.hearts = 4;
        apply_rewards(
            &mut progress,
            &[
                QuestReward {
                    kind: RewardKind::Xp,
                    amount: 20,
                },
                QuestReward {
                    kind: RewardKind::Coins,
                    amount: 15,
                },
                QuestReward {
                    kind: RewardKind::Hearts,
                    amount: 3,
                },
                QuestReward {
                    kind: RewardKind::StreakFreeze,
                    amount: 1,
                },
            ],
        );
        assert_eq!(progress.xp, 20);
        assert_eq!(progress.coins, 15);
        assert_eq!(progress.hearts, MAX_HEARTS);
        assert_eq!(progress.streak_freezes, 1);
    }
}
