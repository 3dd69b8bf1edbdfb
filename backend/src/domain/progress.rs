//! Lesson rewards, hearts and the daily streak.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::curriculum::Lesson;
use super::user::UserProgress;

/// Coins granted for every completed lesson.
pub const COINS_PER_LESSON: u64 = 5;
/// Extra coins for a lesson finished without mistakes.
pub const PERFECT_LESSON_BONUS: u64 = 5;

/// How a day of activity changed the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StreakChange {
    /// Already active today.
    Unchanged,
    /// Active yesterday, streak grows.
    Extended,
    /// Missed one day, a freeze bridged the gap.
    FreezeUsed,
    /// Streak started over.
    Reset,
}

/// Record activity on `today` and update the streak.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use lingo::domain::progress::{StreakChange, advance_streak};
/// use lingo::domain::user::UserProgress;
/// use uuid::Uuid;
///
/// let mut progress = UserProgress::new(Uuid::new_v4());
/// let day = NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date");
/// assert_eq!(advance_streak(&mut progress, day), StreakChange::Reset);
/// assert_eq!(progress.streak_days, 1);
/// ```
pub fn advance_streak(progress: &mut UserProgress, today: NaiveDate) -> StreakChange {
    let change = match progress.last_active_on {
        Some(last) if last >= today => StreakChange::Unchanged,
        Some(last) => match (today - last).num_days() {
            1 => StreakChange::Extended,
            2 if progress.streak_freezes > 0 => StreakChange::FreezeUsed,
            _ => StreakChange::Reset,
        },
        None => StreakChange::Reset,
    };
    match change {
        StreakChange::Unchanged => return change,
        StreakChange::Extended => progress.streak_days = progress.streak_days.saturating_add(1),
        StreakChange::FreezeUsed => {
            progress.streak_freezes -= 1;
            progress.streak_days = progress.streak_days.saturating_add(1);
        }
        StreakChange::Reset => progress.streak_days = 1,
    }
    progress.last_active_on = Some(today);
    change
}

/// XP and coins earned by one lesson completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonReward {
    pub xp: u64,
    pub coins: u64,
    pub first_completion: bool,
    pub perfect: bool,
}

/// Reward for finishing `lesson` with `mistakes` wrong answers.
///
/// Repeats earn half the XP, rounded down.
pub fn lesson_reward(lesson: &Lesson, already_completed: bool, mistakes: u32) -> LessonReward {
    let full_xp = u64::from(lesson.xp_reward);
    let perfect = mistakes == 0;
    LessonReward {
        xp: if already_completed { full_xp / 2 } else { full_xp },
        coins: COINS_PER_LESSON + if perfect { PERFECT_LESSON_BONUS } else { 0 },
        first_completion: !already_completed,
        perfect,
    }
}

/// Result of checking one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub correct: bool,
    /// Expected answer, revealed only after a wrong attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_answer: Option<String>,
    pub hearts: u32,
    pub unlimited_hearts: bool,
}

/// Result of completing a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletion {
    pub reward: LessonReward,
    pub streak_change: StreakChange,
    pub progress: UserProgress,
}
