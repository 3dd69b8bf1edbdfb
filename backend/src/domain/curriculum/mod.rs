//! Course content: languages, chapters, units, lessons and exercises.
//!
//! Content forms a strict tree. Each child refers to its parent by id and
//! carries an `order` that is unique among its siblings. Drafts are the
//! validated input shape for both creation and full updates.

mod tree;

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Error;
use super::ports::Entity;

pub use tree::{
    ChapterNode, CourseTotals, CourseTree, LessonNode, LessonView, UnitNode, build_course_tree,
};

/// Maximum length of titles and names.
pub const TITLE_MAX: usize = 120;
/// Maximum length of descriptions and prompts.
pub const TEXT_MAX: usize = 2000;
/// Upper bound on XP a single lesson may award.
pub const LESSON_XP_MAX: u32 = 1000;
/// XP awarded when a lesson draft does not specify one.
pub const DEFAULT_LESSON_XP: u32 = 10;

static LANGUAGE_CODE_RE: OnceLock<Regex> = OnceLock::new();

fn language_code_regex() -> &'static Regex {
    LANGUAGE_CODE_RE.get_or_init(|| {
        Regex::new("^[a-z]{2,3}(-[a-z0-9]{2,8})?$")
            .unwrap_or_else(|error| panic!("language code regex failed to compile: {error}"))
    })
}

/// Normalise and validate a language code such as `es` or `pt-br`.
///
/// # Examples
/// ```
/// use lingo::domain::curriculum::normalize_language_code;
///
/// assert_eq!(normalize_language_code(" PT-BR ").as_deref(), Some("pt-br"));
/// assert!(normalize_language_code("portuguese").is_none());
/// ```
pub fn normalize_language_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_lowercase();
    language_code_regex().is_match(&code).then_some(code)
}

/// Canonical form used to compare answers: trimmed, lowercase, single spaces.
///
/// # Examples
/// ```
/// use lingo::domain::curriculum::normalize_answer;
///
/// assert_eq!(normalize_answer("  Buenos   DÍAS "), "buenos días");
/// ```
pub fn normalize_answer(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn required_text(field: &str, raw: &str, max: usize) -> Result<String, Error> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(Error::invalid_field(
            field,
            "required",
            format!("{field} must not be empty"),
        ));
    }
    if value.chars().count() > max {
        return Err(Error::invalid_field(
            field,
            "too_long",
            format!("{field} must be at most {max} characters"),
        ));
    }
    Ok(value.to_owned())
}

fn optional_text(field: &str, raw: Option<String>, max: usize) -> Result<Option<String>, Error> {
    match raw {
        Some(value) if !value.trim().is_empty() => required_text(field, &value, max).map(Some),
        _ => Ok(None),
    }
}

fn positive_order(order: u32) -> Result<u32, Error> {
    if order == 0 {
        return Err(Error::invalid_field(
            "order",
            "out_of_range",
            "order must be at least 1",
        ));
    }
    Ok(order)
}

/// A course language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub id: Uuid,
    #[schema(example = "es")]
    pub code: String,
    #[schema(example = "Spanish")]
    pub name: String,
    #[schema(example = "Español")]
    pub native_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
    pub published: bool,
}

/// Create or replace payload for a [`Language`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LanguageDraft {
    pub code: String,
    pub name: String,
    pub native_name: String,
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl LanguageDraft {
    /// Validate into a language with the given id.
    pub fn into_language(self, id: Uuid) -> Result<Language, Error> {
        let code = normalize_language_code(&self.code).ok_or_else(|| {
            Error::invalid_field(
                "code",
                "invalid_language_code",
                "code must look like `es` or `pt-br`",
            )
        })?;
        Ok(Language {
            id,
            code,
            name: required_text("name", &self.name, TITLE_MAX)?,
            native_name: required_text("nativeName", &self.native_name, TITLE_MAX)?,
            flag: optional_text("flag", self.flag, 16)?,
            published: self.published,
        })
    }
}

impl Entity for Language {
    const COLLECTION: &'static str = "languages";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Top-level grouping inside a language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: Uuid,
    pub language_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub order: u32,
}

/// Create or replace payload for a [`Chapter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDraft {
    pub language_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub order: u32,
}

impl ChapterDraft {
    /// Validate into a chapter with the given id.
    pub fn into_chapter(self, id: Uuid) -> Result<Chapter, Error> {
        Ok(Chapter {
            id,
            language_id: self.language_id,
            title: required_text("title", &self.title, TITLE_MAX)?,
            description: optional_text("description", self.description, TEXT_MAX)?,
            order: positive_order(self.order)?,
        })
    }
}

impl Entity for Chapter {
    const COLLECTION: &'static str = "chapters";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Group of lessons inside a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub order: u32,
}

/// Create or replace payload for a [`Unit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnitDraft {
    pub chapter_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub order: u32,
}

impl UnitDraft {
    /// Validate into a unit with the given id.
    pub fn into_unit(self, id: Uuid) -> Result<Unit, Error> {
        Ok(Unit {
            id,
            chapter_id: self.chapter_id,
            title: required_text("title", &self.title, TITLE_MAX)?,
            description: optional_text("description", self.description, TEXT_MAX)?,
            order: positive_order(self.order)?,
        })
    }
}

impl Entity for Unit {
    const COLLECTION: &'static str = "units";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// A playable lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub title: String,
    pub order: u32,
    pub xp_reward: u32,
}

/// Create or replace payload for a [`Lesson`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonDraft {
    pub unit_id: Uuid,
    pub title: String,
    pub order: u32,
    #[serde(default)]
    pub xp_reward: Option<u32>,
}

impl LessonDraft {
    /// Validate into a lesson with the given id.
    pub fn into_lesson(self, id: Uuid) -> Result<Lesson, Error> {
        let xp_reward = self.xp_reward.unwrap_or(DEFAULT_LESSON_XP);
        if xp_reward == 0 || xp_reward > LESSON_XP_MAX {
            return Err(Error::invalid_field(
                "xpReward",
                "out_of_range",
                format!("xpReward must be between 1 and {LESSON_XP_MAX}"),
            ));
        }
        Ok(Lesson {
            id,
            unit_id: self.unit_id,
            title: required_text("title", &self.title, TITLE_MAX)?,
            order: positive_order(self.order)?,
            xp_reward,
        })
    }
}

impl Entity for Lesson {
    const COLLECTION: &'static str = "lessons";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Exercise format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    MultipleChoice,
    Translate,
    FillBlank,
    Listen,
}

/// A single question inside a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub kind: ExerciseKind,
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub answer: String,
    pub order: u32,
}

impl Exercise {
    /// Whether `candidate` matches the expected answer after normalisation.
    pub fn accepts(&self, candidate: &str) -> bool {
        normalize_answer(candidate) == normalize_answer(&self.answer)
    }
}

/// Create or replace payload for an [`Exercise`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDraft {
    pub lesson_id: Uuid,
    pub kind: ExerciseKind,
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub answer: String,
    pub order: u32,
}

impl ExerciseDraft {
    /// Validate into an exercise with the given id.
    ///
    /// Multiple-choice exercises need at least two distinct options, one of
    /// which must match the answer.
    pub fn into_exercise(self, id: Uuid) -> Result<Exercise, Error> {
        let prompt = required_text("prompt", &self.prompt, TEXT_MAX)?;
        let answer = required_text("answer", &self.answer, TEXT_MAX)?;
        let mut options = Vec::with_capacity(self.options.len());
        let mut seen = HashSet::new();
        for option in self.options {
            let option = required_text("options", &option, TITLE_MAX)?;
            if !seen.insert(normalize_answer(&option)) {
                return Err(Error::invalid_field(
                    "options",
                    "duplicate_option",
                    "options must be distinct",
                ));
            }
            options.push(option);
        }
        if self.kind == ExerciseKind::MultipleChoice {
            if options.len() < 2 {
                return Err(Error::invalid_field(
                    "options",
                    "too_few_options",
                    "multiple choice exercises need at least two options",
                ));
            }
            if !seen.contains(&normalize_answer(&answer)) {
                return Err(Error::invalid_field(
                    "answer",
                    "answer_not_in_options",
                    "answer must be one of the options",
                ));
            }
        }
        Ok(Exercise {
            id,
            lesson_id: self.lesson_id,
            kind: self.kind,
            prompt,
            options,
            answer,
            order: positive_order(self.order)?,
        })
    }
}

impl Entity for Exercise {
    const COLLECTION: &'static str = "exercises";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Exercise as shown to learners: the answer stays on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicExercise {
    pub id: Uuid,
    pub kind: ExerciseKind,
    pub prompt: String,
    pub options: Vec<String>,
    pub order: u32,
}

impl From<Exercise> for PublicExercise {
    fn from(value: Exercise) -> Self {
        Self {
            id: value.id,
            kind: value.kind,
            prompt: value.prompt,
            options: value.options,
            order: value.order,
        }
    }
}

/// Check a requested lesson ordering against the unit's current lessons.
///
/// The request must name every lesson exactly once.
pub fn validate_reorder(current: &[Uuid], requested: &[Uuid]) -> Result<(), Error> {
    let requested_set: HashSet<_> = requested.iter().collect();
    if requested_set.len() != requested.len() {
        return Err(Error::invalid_field(
            "lessonIds",
            "duplicate_id",
            "lessonIds must not repeat a lesson",
        ));
    }
    let current_set: HashSet<_> = current.iter().collect();
    if requested_set != current_set {
        return Err(Error::invalid_field(
            "lessonIds",
            "mismatched_ids",
            "lessonIds must list exactly the unit's lessons",
        ));
    }
    Ok(())
}

#[cfg(test)]
impl Language {
    pub(crate) fn fixture(code: &str, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.to_owned(),
            name: name.to_owned(),
            native_name: name.to_owned(),
            flag: None,
            published: true,
        }
    }
}
