//! Driving ports for course content.
//!
//! [`CurriculumCommand`] covers the admin editing surface; [`CurriculumQuery`]
//! serves both the admin listings and the learner course views.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::curriculum::{
    Chapter, ChapterDraft, CourseTree, Exercise, ExerciseDraft, Language, LanguageDraft, Lesson,
    LessonDraft, LessonView, Unit, UnitDraft,
};
use crate::domain::user::User;

/// Admin mutations of the curriculum tree.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CurriculumCommand: Send + Sync {
    async fn create_language(&self, draft: LanguageDraft) -> Result<Language, Error>;
    async fn update_language(&self, id: Uuid, draft: LanguageDraft) -> Result<Language, Error>;
    async fn delete_language(&self, id: Uuid) -> Result<(), Error>;

    async fn create_chapter(&self, draft: ChapterDraft) -> Result<Chapter, Error>;
    async fn update_chapter(&self, id: Uuid, draft: ChapterDraft) -> Result<Chapter, Error>;
    async fn delete_chapter(&self, id: Uuid) -> Result<(), Error>;

    async fn create_unit(&self, draft: UnitDraft) -> Result<Unit, Error>;
    async fn update_unit(&self, id: Uuid, draft: UnitDraft) -> Result<Unit, Error>;
    async fn delete_unit(&self, id: Uuid) -> Result<(), Error>;

    async fn create_lesson(&self, draft: LessonDraft) -> Result<Lesson, Error>;
    async fn update_lesson(&self, id: Uuid, draft: LessonDraft) -> Result<Lesson, Error>;
    async fn delete_lesson(&self, id: Uuid) -> Result<(), Error>;

    /// Replace the ordering of every lesson in a unit.
    ///
    /// `lesson_ids` must list exactly the unit's lessons; position `i` gets
    /// order `i + 1`.
    async fn reorder_lessons(&self, unit_id: Uuid, lesson_ids: Vec<Uuid>)
    -> Result<Vec<Lesson>, Error>;

    async fn create_exercise(&self, draft: ExerciseDraft) -> Result<Exercise, Error>;
    async fn update_exercise(&self, id: Uuid, draft: ExerciseDraft) -> Result<Exercise, Error>;
    async fn delete_exercise(&self, id: Uuid) -> Result<(), Error>;
}

/// Read access to the curriculum tree.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CurriculumQuery: Send + Sync {
    /// Languages ordered by code; unpublished ones only when requested.
    async fn list_languages(&self, include_unpublished: bool) -> Result<Vec<Language>, Error>;
    async fn get_language(&self, id: Uuid) -> Result<Language, Error>;
    async fn list_chapters(&self, language_id: Uuid) -> Result<Vec<Chapter>, Error>;
    async fn list_units(&self, chapter_id: Uuid) -> Result<Vec<Unit>, Error>;
    async fn list_lessons(&self, unit_id: Uuid) -> Result<Vec<Lesson>, Error>;
    async fn list_exercises(&self, lesson_id: Uuid) -> Result<Vec<Exercise>, Error>;

    /// Nested course of a published language with the caller's completion.
    async fn course_tree(&self, user: &User, language_id: Uuid) -> Result<CourseTree, Error>;

    /// Lesson with its exercises, answers withheld.
    async fn lesson_view(&self, user: &User, lesson_id: Uuid) -> Result<LessonView, Error>;
}
