//! Curriculum editing and course views.

use async_trait::async_trait;
use tracing::{error, info};
use uuid::Uuid;

use super::curriculum::{
    Chapter, ChapterDraft, CourseTree, Exercise, ExerciseDraft, Language, LanguageDraft, Lesson,
    LessonDraft, LessonView, PublicExercise, Unit, UnitDraft, build_course_tree,
    validate_reorder,
};
use super::lookup::{delete, ensure_no_children, find_values, insert, replace, require};
use super::ports::{
    CurriculumCommand, CurriculumQuery, Entity, Query, Repositories, Repository, Versioned,
    map_repository_error,
};
use super::user::User;
use super::Error;

/// Curriculum service backed by the content repositories.
#[derive(Clone)]
pub struct CurriculumService {
    repos: Repositories,
}

impl CurriculumService {
    /// Create a service over the given repositories.
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    async fn ensure_code_free(&self, code: &str, exclude: Option<Uuid>) -> Result<(), Error> {
        let existing =
            find_values(self.repos.languages.as_ref(), &Query::all().eq("code", code)).await?;
        if existing.iter().any(|language| Some(language.id) != exclude) {
            return Err(Error::conflict_with_code(
                "duplicate_code",
                format!("language code {code} already exists"),
            ));
        }
        Ok(())
    }

    /// Language must exist and be published unless the caller is an admin.
    async fn visible_language(&self, user: &User, id: Uuid) -> Result<Language, Error> {
        let language = require(self.repos.languages.as_ref(), id, "language")
            .await?
            .into_inner();
        if !language.published && !user.is_admin() {
            return Err(Error::not_found(format!("language {id} not found")));
        }
        Ok(language)
    }

    async fn shift_lessons(&self, moves: &mut [LessonMove], park: bool) -> Result<(), Error> {
        for (index, step) in moves.iter_mut().enumerate() {
            let mut next = step.stored.clone();
            next.value.order = if park {
                parked_order(index)
            } else {
                step.target
            };
            step.stored = replace(self.repos.lessons.as_ref(), next).await?;
        }
        Ok(())
    }

    /// Put lessons touched by a failed reorder back where they were.
    async fn restore_lessons(&self, moves: Vec<LessonMove>) {
        for step in moves {
            if step.stored.value.order == step.original {
                continue;
            }
            let mut stored = step.stored;
            let lesson_id = stored.value.id;
            stored.value.order = step.original;
            if let Err(error) = replace(self.repos.lessons.as_ref(), stored).await {
                error!(
                    %lesson_id,
                    order = step.original,
                    error = %error,
                    "lesson order not restored"
                );
            }
        }
    }

    async fn completed_lessons(&self, user: &User) -> Result<Vec<Uuid>, Error> {
        Ok(self
            .repos
            .progress
            .get(user.id)
            .await
            .map_err(map_repository_error)?
            .map(|progress| progress.value.completed_lessons)
            .unwrap_or_default())
    }
}

/// A lesson whose order changes during a reorder.
struct LessonMove {
    stored: Versioned<Lesson>,
    original: u32,
    target: u32,
}

/// Temporary order for the `index`th moving lesson, far above any real one.
fn parked_order(index: usize) -> u32 {
    u32::MAX.saturating_sub(u32::try_from(index).unwrap_or(u32::MAX))
}

/// Reject `order` when a sibling under the same parent already uses it.
async fn ensure_order_free<T: Entity>(
    repo: &dyn Repository<T>,
    parent_field: &str,
    parent_id: Uuid,
    order: u32,
    exclude: Option<Uuid>,
) -> Result<(), Error> {
    let query = Query::all().eq(parent_field, parent_id).eq("order", order);
    let clashes = find_values(repo, &query).await?;
    if clashes.iter().any(|sibling| Some(sibling.id()) != exclude) {
        return Err(Error::conflict_with_code(
            "duplicate_order",
            format!("order {order} is already used under {parent_field} {parent_id}"),
        ));
    }
    Ok(())
}

async fn overwrite<T: Entity>(
    repo: &dyn Repository<T>,
    current: Versioned<T>,
    value: T,
) -> Result<T, Error> {
    let revision = current.revision;
    replace(repo, Versioned::new(value, revision))
        .await
        .map(Versioned::into_inner)
}

fn sorted_by_order<T>(mut items: Vec<T>, order: impl Fn(&T) -> u32) -> Vec<T> {
    items.sort_by_key(|item| order(item));
    items
}

#[async_trait]
impl CurriculumCommand for CurriculumService {
    async fn create_language(&self, draft: LanguageDraft) -> Result<Language, Error> {
        let language = draft.into_language(Uuid::new_v4())?;
        self.ensure_code_free(&language.code, None).await?;
        let language = insert(self.repos.languages.as_ref(), language).await?;
        info!(language_id = %language.id, code = %language.code, "language created");
        Ok(language)
    }

    async fn update_language(&self, id: Uuid, draft: LanguageDraft) -> Result<Language, Error> {
        let current = require(self.repos.languages.as_ref(), id, "language").await?;
        let language = draft.into_language(id)?;
        if language.code != current.value.code {
            self.ensure_code_free(&language.code, Some(id)).await?;
        }
        overwrite(self.repos.languages.as_ref(), current, language).await
    }

    async fn delete_language(&self, id: Uuid) -> Result<(), Error> {
        require(self.repos.languages.as_ref(), id, "language").await?;
        ensure_no_children(
            self.repos.chapters.as_ref(),
            &Query::all().eq("languageId", id),
            "language",
        )
        .await?;
        delete(self.repos.languages.as_ref(), id, "language").await?;
        info!(language_id = %id, "language deleted");
        Ok(())
    }

    async fn create_chapter(&self, draft: ChapterDraft) -> Result<Chapter, Error> {
        let chapter = draft.into_chapter(Uuid::new_v4())?;
        require(self.repos.languages.as_ref(), chapter.language_id, "language").await?;
        ensure_order_free(
            self.repos.chapters.as_ref(),
            "languageId",
            chapter.language_id,
            chapter.order,
            None,
        )
        .await?;
        insert(self.repos.chapters.as_ref(), chapter).await
    }

    async fn update_chapter(&self, id: Uuid, draft: ChapterDraft) -> Result<Chapter, Error> {
        let current = require(self.repos.chapters.as_ref(), id, "chapter").await?;
        let chapter = draft.into_chapter(id)?;
        if chapter.language_id != current.value.language_id {
            require(self.repos.languages.as_ref(), chapter.language_id, "language").await?;
        }
        ensure_order_free(
            self.repos.chapters.as_ref(),
            "languageId",
            chapter.language_id,
            chapter.order,
            Some(id),
        )
        .await?;
        overwrite(self.repos.chapters.as_ref(), current, chapter).await
    }

    async fn delete_chapter(&self, id: Uuid) -> Result<(), Error> {
        require(self.repos.chapters.as_ref(), id, "chapter").await?;
        ensure_no_children(
            self.repos.units.as_ref(),
            &Query::all().eq("chapterId", id),
            "chapter",
        )
        .await?;
        delete(self.repos.chapters.as_ref(), id, "chapter").await
    }

    async fn create_unit(&self, draft: UnitDraft) -> Result<Unit, Error> {
        let unit = draft.into_unit(Uuid::new_v4())?;
        require(self.repos.chapters.as_ref(), unit.chapter_id, "chapter").await?;
        ensure_order_free(
            self.repos.units.as_ref(),
            "chapterId",
            unit.chapter_id,
            unit.order,
            None,
        )
        .await?;
        insert(self.repos.units.as_ref(), unit).await
    }

    async fn update_unit(&self, id: Uuid, draft: UnitDraft) -> Result<Unit, Error> {
        let current = require(self.repos.units.as_ref(), id, "unit").await?;
        let unit = draft.into_unit(id)?;
        if unit.chapter_id != current.value.chapter_id {
            require(self.repos.chapters.as_ref(), unit.chapter_id, "chapter").await?;
        }
        ensure_order_free(
            self.repos.units.as_ref(),
            "chapterId",
            unit.chapter_id,
            unit.order,
            Some(id),
        )
        .await?;
        overwrite(self.repos.units.as_ref(), current, unit).await
    }

    async fn delete_unit(&self, id: Uuid) -> Result<(), Error> {
        require(self.repos.units.as_ref(), id, "unit").await?;
        ensure_no_children(
            self.repos.lessons.as_ref(),
            &Query::all().eq("unitId", id),
            "unit",
        )
        .await?;
        delete(self.repos.units.as_ref(), id, "unit").await
    }

    async fn create_lesson(&self, draft: LessonDraft) -> Result<Lesson, Error> {
        let lesson = draft.into_lesson(Uuid::new_v4())?;
        require(self.repos.units.as_ref(), lesson.unit_id, "unit").await?;
        ensure_order_free(
            self.repos.lessons.as_ref(),
            "unitId",
            lesson.unit_id,
            lesson.order,
            None,
        )
        .await?;
        let lesson = insert(self.repos.lessons.as_ref(), lesson).await?;
        info!(lesson_id = %lesson.id, unit_id = %lesson.unit_id, "lesson created");
        Ok(lesson)
    }

    async fn update_lesson(&self, id: Uuid, draft: LessonDraft) -> Result<Lesson, Error> {
        let current = require(self.repos.lessons.as_ref(), id, "lesson").await?;
        let lesson = draft.into_lesson(id)?;
        if lesson.unit_id != current.value.unit_id {
            require(self.repos.units.as_ref(), lesson.unit_id, "unit").await?;
        }
        if lesson.unit_id != current.value.unit_id || lesson.order != current.value.order {
            ensure_order_free(
                self.repos.lessons.as_ref(),
                "unitId",
                lesson.unit_id,
                lesson.order,
                Some(id),
            )
            .await?;
        }
        overwrite(self.repos.lessons.as_ref(), current, lesson).await
    }

    async fn delete_lesson(&self, id: Uuid) -> Result<(), Error> {
        require(self.repos.lessons.as_ref(), id, "lesson").await?;
        ensure_no_children(
            self.repos.exercises.as_ref(),
            &Query::all().eq("lessonId", id),
            "lesson",
        )
        .await?;
        delete(self.repos.lessons.as_ref(), id, "lesson").await
    }

    async fn reorder_lessons(
        &self,
        unit_id: Uuid,
        lesson_ids: Vec<Uuid>,
    ) -> Result<Vec<Lesson>, Error> {
        require(self.repos.units.as_ref(), unit_id, "unit").await?;
        let current = self
            .repos
            .lessons
            .find(&Query::all().eq("unitId", unit_id))
            .await
            .map_err(map_repository_error)?;
        let current_ids: Vec<Uuid> = current.iter().map(|lesson| lesson.value.id).collect();
        validate_reorder(&current_ids, &lesson_ids)?;

        let mut reordered = Vec::with_capacity(current.len());
        let mut moves = Vec::new();
        for stored in current {
            let position = lesson_ids
                .iter()
                .position(|id| *id == stored.value.id)
                .unwrap_or_default();
            let target = u32::try_from(position + 1).unwrap_or(u32::MAX);
            if stored.value.order == target {
                reordered.push(stored.value);
            } else {
                let original = stored.value.order;
                moves.push(LessonMove {
                    stored,
                    original,
                    target,
                });
            }
        }

        // Park moving lessons on orders no real lesson uses, then settle them,
        // so no two lessons of the unit ever share an order.
        for park in [true, false] {
            if let Err(error) = self.shift_lessons(&mut moves, park).await {
                self.restore_lessons(moves).await;
                return Err(error);
            }
        }
        reordered.extend(moves.into_iter().map(|step| step.stored.value));
        info!(unit_id = %unit_id, lessons = reordered.len(), "lessons reordered");
        Ok(sorted_by_order(reordered, |lesson| lesson.order))
    }

    async fn create_exercise(&self, draft: ExerciseDraft) -> Result<Exercise, Error> {
        let exercise = draft.into_exercise(Uuid::new_v4())?;
        require(self.repos.lessons.as_ref(), exercise.lesson_id, "lesson").await?;
        ensure_order_free(
            self.repos.exercises.as_ref(),
            "lessonId",
            exercise.lesson_id,
            exercise.order,
            None,
        )
        .await?;
        insert(self.repos.exercises.as_ref(), exercise).await
    }

    async fn update_exercise(&self, id: Uuid, draft: ExerciseDraft) -> Result<Exercise, Error> {
        let current = require(self.repos.exercises.as_ref(), id, "exercise").await?;
        let exercise = draft.into_exercise(id)?;
        if exercise.lesson_id != current.value.lesson_id {
            require(self.repos.lessons.as_ref(), exercise.lesson_id, "lesson").await?;
        }
        ensure_order_free(
            self.repos.exercises.as_ref(),
            "lessonId",
            exercise.lesson_id,
            exercise.order,
            Some(id),
        )
        .await?;
        overwrite(self.repos.exercises.as_ref(), current, exercise).await
    }

    async fn delete_exercise(&self, id: Uuid) -> Result<(), Error> {
        delete(self.repos.exercises.as_ref(), id, "exercise").await
    }
}

#[async_trait]
impl CurriculumQuery for CurriculumService {
    async fn list_languages(&self, include_unpublished: bool) -> Result<Vec<Language>, Error> {
        let query = if include_unpublished {
            Query::all()
        } else {
            Query::all().eq("published", true)
        };
        let mut languages = find_values(self.repos.languages.as_ref(), &query).await?;
        languages.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(languages)
    }

    async fn get_language(&self, id: Uuid) -> Result<Language, Error> {
        require(self.repos.languages.as_ref(), id, "language")
            .await
            .map(Versioned::into_inner)
    }

    async fn list_chapters(&self, language_id: Uuid) -> Result<Vec<Chapter>, Error> {
        let query = Query::all().eq("languageId", language_id);
        let chapters = find_values(self.repos.chapters.as_ref(), &query).await?;
        Ok(sorted_by_order(chapters, |chapter| chapter.order))
    }

    async fn list_units(&self, chapter_id: Uuid) -> Result<Vec<Unit>, Error> {
        let query = Query::all().eq("chapterId", chapter_id);
        let units = find_values(self.repos.units.as_ref(), &query).await?;
        Ok(sorted_by_order(units, |unit| unit.order))
    }

    async fn list_lessons(&self, unit_id: Uuid) -> Result<Vec<Lesson>, Error> {
        let query = Query::all().eq("unitId", unit_id);
        let lessons = find_values(self.repos.lessons.as_ref(), &query).await?;
        Ok(sorted_by_order(lessons, |lesson| lesson.order))
    }

    async fn list_exercises(&self, lesson_id: Uuid) -> Result<Vec<Exercise>, Error> {
        let query = Query::all().eq("lessonId", lesson_id);
        let exercises = find_values(self.repos.exercises.as_ref(), &query).await?;
        Ok(sorted_by_order(exercises, |exercise| exercise.order))
    }

    async fn course_tree(&self, user: &User, language_id: Uuid) -> Result<CourseTree, Error> {
        let language = self.visible_language(user, language_id).await?;
        let chapters = self.list_chapters(language_id).await?;
        let mut units = Vec::new();
        for chapter in &chapters {
            units.extend(self.list_units(chapter.id).await?);
        }
        let mut lessons = Vec::new();
        for unit in &units {
            lessons.extend(self.list_lessons(unit.id).await?);
        }
        let mut exercises = Vec::new();
        for lesson in &lessons {
            exercises.extend(self.list_exercises(lesson.id).await?);
        }
        let completed = self.completed_lessons(user).await?;
        Ok(build_course_tree(
            language, chapters, units, lessons, &exercises, &completed,
        ))
    }

    async fn lesson_view(&self, user: &User, lesson_id: Uuid) -> Result<LessonView, Error> {
        let lesson = require(self.repos.lessons.as_ref(), lesson_id, "lesson")
            .await?
            .into_inner();
        let unit = require(self.repos.units.as_ref(), lesson.unit_id, "unit").await?;
        let chapter = require(self.repos.chapters.as_ref(), unit.value.chapter_id, "chapter").await?;
        self.visible_language(user, chapter.value.language_id)
            .await
            .map_err(|_| Error::not_found(format!("lesson {lesson_id} not found")))?;
        let exercises = self
            .list_exercises(lesson_id)
            .await?
            .into_iter()
            .map(PublicExercise::from)
            .collect();
        let completed = self.completed_lessons(user).await?.contains(&lesson_id);
        Ok(LessonView {
            lesson,
            exercises,
            completed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockRepository;
    use crate::domain::test_doubles::{FailReplace, StoredRepository};
    use rstest::{fixture, rstest};

    fn conflict_code(error: &Error) -> Option<&str> {
        error
            .details()
            .and_then(|details| details.get("code"))
            .and_then(|code| code.as_str())
    }

    fn lesson_draft(unit_id: Uuid, order: u32) -> LessonDraft {
        LessonDraft {
            unit_id,
            title: "Greetings".to_owned(),
            order,
            xp_reward: Some(10),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn creating_a_chapter_under_a_missing_language_is_not_found() {
        let service = CurriculumService::new(Repositories::fixtures());
        let err = service
            .create_chapter(ChapterDraft {
                language_id: Uuid::new_v4(),
                title: "Basics".to_owned(),
                description: None,
                order: 1,
            })
            .await
            .expect_err("missing parent");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn creating_a_lesson_with_a_used_order_conflicts() {
        let unit = Unit {
            id: Uuid::new_v4(),
            chapter_id: Uuid::new_v4(),
            title: "Greetings".to_owned(),
            description: None,
            order: 1,
        };
        let unit_id = unit.id;
        let mut units = MockRepository::<Unit>::new();
        units
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(unit.clone(), 1))));
        let mut lessons = MockRepository::<Lesson>::new();
        lessons.expect_find().returning(move |_| {
            let sibling = lesson_draft(unit_id, 2)
                .into_lesson(Uuid::new_v4())
                .expect("valid sibling");
            Ok(vec![Versioned::new(sibling, 1)])
        });
        lessons.expect_insert().never();

        let mut repos = Repositories::fixtures();
        repos.units = Arc::new(units);
        repos.lessons = Arc::new(lessons);
        let err = CurriculumService::new(repos)
            .create_lesson(lesson_draft(unit_id, 2))
            .await
            .expect_err("duplicate order");
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(conflict_code(&err), Some("duplicate_order"));
    }

    struct UnitFixture {
        service: CurriculumService,
        lessons: Arc<StoredRepository<Lesson>>,
        unit_id: Uuid,
        first: Uuid,
        second: Uuid,
    }

    /// A unit holding lessons at orders 1 and 2, in that order.
    #[fixture]
    fn unit_with_two_lessons() -> UnitFixture {
        let unit = Unit {
            id: Uuid::new_v4(),
            chapter_id: Uuid::new_v4(),
            title: "Greetings".to_owned(),
            description: None,
            order: 1,
        };
        let unit_id = unit.id;
        let first = lesson_draft(unit_id, 1)
            .into_lesson(Uuid::new_v4())
            .expect("valid lesson");
        let second = lesson_draft(unit_id, 2)
            .into_lesson(Uuid::new_v4())
            .expect("valid lesson");
        let (first_id, second_id) = (first.id, second.id);
        let lessons = Arc::new(StoredRepository::with([first, second]));
        let mut repos = Repositories::fixtures();
        repos.units = Arc::new(StoredRepository::with([unit]));
        repos.lessons = lessons.clone();
        UnitFixture {
            service: CurriculumService::new(repos),
            lessons,
            unit_id,
            first: first_id,
            second: second_id,
        }
    }

    fn order_of(lessons: &StoredRepository<Lesson>, id: Uuid) -> Option<u32> {
        lessons.value(id).map(|lesson| lesson.order)
    }

    #[rstest]
    #[tokio::test]
    async fn reorder_swaps_lesson_orders(unit_with_two_lessons: UnitFixture) {
        let UnitFixture {
            service,
            lessons,
            unit_id,
            first,
            second,
        } = unit_with_two_lessons;
        let reordered = service
            .reorder_lessons(unit_id, vec![second, first])
            .await
            .expect("reorder");
        let ids: Vec<Uuid> = reordered.iter().map(|lesson| lesson.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert_eq!(order_of(&lessons, second), Some(1));
        assert_eq!(order_of(&lessons, first), Some(2));
    }

    #[rstest]
    #[case::while_parking(2)]
    #[case::while_settling_first(3)]
    #[case::while_settling_last(4)]
    #[tokio::test]
    async fn failed_reorder_restores_original_orders(
        unit_with_two_lessons: UnitFixture,
        #[case] failing_write: usize,
    ) {
        let UnitFixture {
            service,
            lessons,
            unit_id,
            first,
            second,
        } = unit_with_two_lessons;
        lessons.fail_replace(FailReplace::Call(failing_write));

        let err = service
            .reorder_lessons(unit_id, vec![second, first])
            .await
            .expect_err("write fails");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
        assert_eq!(order_of(&lessons, first), Some(1));
        assert_eq!(order_of(&lessons, second), Some(2));
    }

    #[rstest]
    #[tokio::test]
    async fn moving_a_lesson_onto_a_used_order_conflicts(unit_with_two_lessons: UnitFixture) {
        let UnitFixture {
            service,
            lessons,
            unit_id,
            first,
            ..
        } = unit_with_two_lessons;
        let err = service
            .update_lesson(first, lesson_draft(unit_id, 2))
            .await
            .expect_err("duplicate order");
        assert_eq!(conflict_code(&err), Some("duplicate_order"));
        assert_eq!(order_of(&lessons, first), Some(1));
    }

    #[rstest]
    #[tokio::test]
    async fn deleting_a_language_with_chapters_conflicts() {
        let language = Language::fixture("es", "Spanish");
        let language_id = language.id;
        let mut languages = MockRepository::<Language>::new();
        languages
            .expect_get()
            .returning(move |_| Ok(Some(Versioned::new(language.clone(), 1))));
        languages.expect_delete().never();
        let mut chapters = MockRepository::<Chapter>::new();
        chapters.expect_count().returning(|_| Ok(2));

        let mut repos = Repositories::fixtures();
        repos.languages = Arc::new(languages);
        repos.chapters = Arc::new(chapters);
        let err = CurriculumService::new(repos)
            .delete_language(language_id)
            .await
            .expect_err("has children");
        assert_eq!(conflict_code(&err), Some("has_children"));
    }

    #[rstest]
    #[tokio::test]
    async fn repository_outage_surfaces_as_service_unavailable() {
        let mut languages = MockRepository::<Language>::new();
        languages
            .expect_find()
            .returning(|_| Err(crate::domain::ports::RepositoryError::connection("refused")));
        let mut repos = Repositories::fixtures();
        repos.languages = Arc::new(languages);
        let err = CurriculumService::new(repos)
            .list_languages(false)
            .await
            .expect_err("outage");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
