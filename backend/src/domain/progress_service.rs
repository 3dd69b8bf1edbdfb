//! Learning loop: course selection, answers and lesson completion.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::Error;
use super::curriculum::Lesson;
use super::lookup::{progress_of, require, update_progress};
use super::ports::{ProgressCommand, ProgressQuery, QuestEvents, Repositories};
use super::progress::{
    AnswerOutcome, LessonCompletion, LessonReward, StreakChange, advance_streak, lesson_reward,
};
use super::quests::QuestMetric;
use super::user::{User, UserProgress};

fn out_of_hearts() -> Error {
    Error::conflict_with_code("out_of_hearts", "no hearts left, refill them in the shop")
}

/// Progress service over the content and progress repositories.
#[derive(Clone)]
pub struct ProgressService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
    quest_events: Arc<dyn QuestEvents>,
}

impl ProgressService {
    /// Create a service that reports activity to `quest_events`.
    pub fn new(
        repos: Repositories,
        clock: Arc<dyn Clock>,
        quest_events: Arc<dyn QuestEvents>,
    ) -> Self {
        Self {
            repos,
            clock,
            quest_events,
        }
    }

    /// Lesson must exist and belong to a published language.
    async fn playable_lesson(&self, user: &User, lesson_id: Uuid) -> Result<Lesson, Error> {
        let lesson = require(self.repos.lessons.as_ref(), lesson_id, "lesson")
            .await?
            .into_inner();
        let unit = require(self.repos.units.as_ref(), lesson.unit_id, "unit").await?;
        let chapter =
            require(self.repos.chapters.as_ref(), unit.value.chapter_id, "chapter").await?;
        let language = require(
            self.repos.languages.as_ref(),
            chapter.value.language_id,
            "language",
        )
        .await?;
        if !language.value.published && !user.is_admin() {
            return Err(Error::not_found(format!("lesson {lesson_id} not found")));
        }
        Ok(lesson)
    }

    async fn emit(&self, user_id: Uuid, metric: QuestMetric, amount: u64) {
        if let Err(error) = self.quest_events.record_event(user_id, metric, amount).await {
            warn!(%user_id, ?metric, error = %error, "quest event dropped");
        }
    }
}

#[async_trait]
impl ProgressQuery for ProgressService {
    async fn get_progress(&self, user: &User) -> Result<UserProgress, Error> {
        progress_of(self.repos.progress.as_ref(), user.id)
            .await
            .map(|progress| progress.into_inner())
    }
}

#[async_trait]
impl ProgressCommand for ProgressService {
    async fn select_course(&self, user: &User, language_id: Uuid) -> Result<UserProgress, Error> {
        let language = require(self.repos.languages.as_ref(), language_id, "language")
            .await?
            .into_inner();
        if !language.published && !user.is_admin() {
            return Err(Error::not_found(format!("language {language_id} not found")));
        }
        let progress = update_progress(self.repos.progress.as_ref(), user.id, |progress| {
            progress.active_language_id = Some(language_id);
            Ok(())
        })
        .await?;
        info!(user_id = %user.id, %language_id, "course selected");
        Ok(progress)
    }

    async fn check_answer(
        &self,
        user: &User,
        lesson_id: Uuid,
        exercise_id: Uuid,
        answer: String,
    ) -> Result<AnswerOutcome, Error> {
        let exercise = require(self.repos.exercises.as_ref(), exercise_id, "exercise")
            .await?
            .into_inner();
        if exercise.lesson_id != lesson_id {
            return Err(Error::not_found(format!(
                "exercise {exercise_id} not found in lesson {lesson_id}"
            )));
        }
        self.playable_lesson(user, lesson_id).await?;

        let unlimited_hearts = user.has_unlimited_hearts(self.clock.utc());
        let mut progress = progress_of(self.repos.progress.as_ref(), user.id)
            .await?
            .into_inner();
        if !unlimited_hearts && progress.hearts == 0 {
            debug!(user_id = %user.id, "answer rejected without hearts");
            return Err(out_of_hearts());
        }

        let correct = exercise.accepts(&answer);
        if !correct && !unlimited_hearts {
            progress = update_progress(self.repos.progress.as_ref(), user.id, |progress| {
                if progress.hearts == 0 {
                    return Err(out_of_hearts());
                }
                progress.hearts -= 1;
                Ok(())
            })
            .await?;
        }
        Ok(AnswerOutcome {
            correct,
            expected_answer: (!correct).then_some(exercise.answer),
            hearts: progress.hearts,
            unlimited_hearts,
        })
    }

    async fn complete_lesson(
        &self,
        user: &User,
        lesson_id: Uuid,
        mistakes: u32,
    ) -> Result<LessonCompletion, Error> {
        let lesson = self.playable_lesson(user, lesson_id).await?;
        let today = self.clock.utc().date_naive();
        let mut outcome: Option<(LessonReward, StreakChange)> = None;
        let progress = update_progress(self.repos.progress.as_ref(), user.id, |progress| {
            let reward = lesson_reward(&lesson, progress.has_completed(lesson.id), mistakes);
            progress.xp = progress.xp.saturating_add(reward.xp);
            progress.coins = progress.coins.saturating_add(reward.coins);
            let streak_change = advance_streak(progress, today);
            progress.mark_completed(lesson.id);
            outcome = Some((reward, streak_change));
            Ok(())
        })
        .await?;
        let (reward, streak_change) =
            outcome.ok_or_else(|| Error::internal("lesson reward was not computed"))?;
        info!(
            user_id = %user.id,
            %lesson_id,
            xp = reward.xp,
            coins = reward.coins,
            streak = progress.streak_days,
            "lesson completed"
        );

        self.emit(user.id, QuestMetric::LessonsCompleted, 1).await;
        if reward.xp > 0 {
            self.emit(user.id, QuestMetric::XpEarned, reward.xp).await;
        }
        if reward.perfect {
            self.emit(user.id, QuestMetric::PerfectLessons, 1).await;
        }
        self.emit(
            user.id,
            QuestMetric::StreakDays,
            u64::from(progress.streak_days),
        )
        .await;

        Ok(LessonCompletion {
            reward,
            streak_change,
            progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::curriculum::{Exercise, ExerciseKind};
    use crate::domain::ports::{MockRepository, Versioned};
    use crate::domain::user::{DisplayName, Role};
    use crate::test_support::MutableClock;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn learner() -> User {
        User {
            id: Uuid::new_v4(),
            external_id: "sub".to_owned(),
            email: None,
            display_name: DisplayName::default_name(),
            role: Role::Learner,
            subscription: None,
            created_at: Utc::now(),
        }
    }

    fn clock() -> Arc<dyn Clock> {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 2, 8, 0, 0)
            .single()
            .expect("valid timestamp");
        Arc::new(MutableClock::new(now))
    }

    #[rstest]
    #[tokio::test]
    async fn exercise_from_another_lesson_is_not_found() {
        let exercise = Exercise {
            id: Uuid::new_v4(),
            lesson_id: Uuid::new_v4(),
            kind: ExerciseKind::Translate,
            prompt: "Hello".to_owned(),
            options: Vec::new(),
            answer: "hola".to_owned(),
            order: 1,
        };
        let exercise_id = exercise.id;
        let mut exercises = MockRepository::<Exercise>::new();
        exercises
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(exercise.clone(), 1))));
        let mut repos = Repositories::fixtures();
        repos.exercises = Arc::new(exercises);

        let service = ProgressService::new(
            repos,
            clock(),
            Arc::new(crate::domain::ports::NoOpQuestEvents),
        );
        let err = service
            .check_answer(&learner(), Uuid::new_v4(), exercise_id, "hola".to_owned())
            .await
            .expect_err("wrong lesson");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn completing_a_missing_lesson_emits_no_events() {
        let mut events = crate::domain::ports::MockQuestEvents::new();
        events.expect_record_event().never();
        let service = ProgressService::new(Repositories::fixtures(), clock(), Arc::new(events));
        let err = service
            .complete_lesson(&learner(), Uuid::new_v4(), 0)
            .await
            .expect_err("missing lesson");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
