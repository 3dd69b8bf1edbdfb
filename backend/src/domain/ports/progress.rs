//! Driving ports for the learning loop.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::progress::{AnswerOutcome, LessonCompletion};
use crate::domain::user::{User, UserProgress};

/// Learner actions that change progress.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressCommand: Send + Sync {
    /// Make a published language the caller's active course.
    async fn select_course(&self, user: &User, language_id: Uuid) -> Result<UserProgress, Error>;

    /// Check one answer, costing a heart when wrong.
    async fn check_answer(
        &self,
        user: &User,
        lesson_id: Uuid,
        exercise_id: Uuid,
        answer: String,
    ) -> Result<AnswerOutcome, Error>;

    /// Finish a lesson and collect XP, coins and streak.
    async fn complete_lesson(
        &self,
        user: &User,
        lesson_id: Uuid,
        mistakes: u32,
    ) -> Result<LessonCompletion, Error>;
}

/// Read access to learner progress.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressQuery: Send + Sync {
    async fn get_progress(&self, user: &User) -> Result<UserProgress, Error>;
}
