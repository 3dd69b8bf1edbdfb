//! Nested course view assembled from flat collections.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Chapter, Exercise, Language, Lesson, PublicExercise, Unit};

/// Lesson leaf with learner-specific completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonNode {
    pub id: Uuid,
    pub title: String,
    pub order: u32,
    pub xp_reward: u32,
    pub exercise_count: u32,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnitNode {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub order: u32,
    pub lessons: Vec<LessonNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChapterNode {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub order: u32,
    pub units: Vec<UnitNode>,
}

/// Course-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseTotals {
    pub chapters: u32,
    pub units: u32,
    pub lessons: u32,
    pub exercises: u32,
    pub completed_lessons: u32,
    /// Integer percentage of lessons completed, 0 for an empty course.
    pub percent_complete: u8,
}

/// A language with its whole content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseTree {
    pub language: Language,
    pub chapters: Vec<ChapterNode>,
    pub totals: CourseTotals,
}

/// A lesson opened for play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
    pub lesson: Lesson,
    pub exercises: Vec<PublicExercise>,
    pub completed: bool,
}

fn count(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Assemble the course tree for `language`.
///
/// Children whose parent is missing from the input are dropped. Every level
/// is sorted by `order`. `completed` lists the learner's finished lessons.
pub fn build_course_tree(
    language: Language,
    mut chapters: Vec<Chapter>,
    mut units: Vec<Unit>,
    mut lessons: Vec<Lesson>,
    exercises: &[Exercise],
    completed: &[Uuid],
) -> CourseTree {
    chapters.retain(|chapter| chapter.language_id == language.id);
    chapters.sort_by_key(|chapter| chapter.order);
    units.sort_by_key(|unit| unit.order);
    lessons.sort_by_key(|lesson| lesson.order);

    let completed: HashSet<Uuid> = completed.iter().copied().collect();
    let mut exercise_counts: HashMap<Uuid, u32> = HashMap::new();
    for exercise in exercises {
        *exercise_counts.entry(exercise.lesson_id).or_default() += 1;
    }

    let mut lessons_by_unit: HashMap<Uuid, Vec<LessonNode>> = HashMap::new();
    for lesson in lessons {
        lessons_by_unit
            .entry(lesson.unit_id)
            .or_default()
            .push(LessonNode {
                id: lesson.id,
                exercise_count: exercise_counts.get(&lesson.id).copied().unwrap_or(0),
                completed: completed.contains(&lesson.id),
                title: lesson.title,
                order: lesson.order,
                xp_reward: lesson.xp_reward,
            });
    }

    let mut units_by_chapter: HashMap<Uuid, Vec<UnitNode>> = HashMap::new();
    for unit in units {
        units_by_chapter
            .entry(unit.chapter_id)
            .or_default()
            .push(UnitNode {
                lessons: lessons_by_unit.remove(&unit.id).unwrap_or_default(),
                id: unit.id,
                title: unit.title,
                description: unit.description,
                order: unit.order,
            });
    }

    let chapters: Vec<ChapterNode> = chapters
        .into_iter()
        .map(|chapter| ChapterNode {
            units: units_by_chapter.remove(&chapter.id).unwrap_or_default(),
            id: chapter.id,
            title: chapter.title,
            description: chapter.description,
            order: chapter.order,
        })
        .collect();

    let totals = totals_for(&chapters);
    CourseTree {
        language,
        chapters,
        totals,
    }
}

fn totals_for(chapters: &[ChapterNode]) -> CourseTotals {
    let units = chapters.iter().flat_map(|chapter| chapter.units.iter());
    let lessons: Vec<&LessonNode> = units
        .clone()
        .flat_map(|unit| unit.lessons.iter())
        .collect();
    let completed = lessons.iter().filter(|lesson| lesson.completed).count();
    let percent_complete = if lessons.is_empty() {
        0
    } else {
        u8::try_from(completed * 100 / lessons.len()).unwrap_or(100)
    };
    CourseTotals {
        chapters: count(chapters.len()),
        units: count(units.count()),
        lessons: count(lessons.len()),
        exercises: lessons.iter().map(|lesson| lesson.exercise_count).sum(),
        completed_lessons: count(completed),
        percent_complete,
    }
}
