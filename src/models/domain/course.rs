use std::collections::HashSet;

use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    Basic,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum LessonType {
    Video,
    Text,
    Quiz,
    Assignment,
    Resource,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub lesson_type: LessonType,
    pub duration_minutes: u32,
    #[serde(default)]
    pub preview: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct CourseModule {
    pub order: u32,
    pub title: String,
    pub lessons: Vec<Lesson>,
}

impl CourseModule {
    /// Saturates at `u32::MAX`.
    pub fn duration_minutes(&self) -> u32 {
        self.lessons
            .iter()
            .fold(0u32, |total, l| total.saturating_add(l.duration_minutes))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub category: String,
    pub level: CourseLevel,
    pub modules: Vec<CourseModule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Course {
    /// Checks the structural invariants: module orders run 1..=n without gaps
    /// or repeats, and every lesson id appears in exactly one module.
    pub fn validate_structure(&self) -> AppResult<()> {
        let mut orders: Vec<u32> = self.modules.iter().map(|m| m.order).collect();
        orders.sort_unstable();
        for (expected, actual) in (1u32..).zip(orders.iter()) {
            if expected != *actual {
                return Err(AppError::ValidationError(format!(
                    "Module order values must be unique and contiguous from 1 (found {:?})",
                    orders
                )));
            }
        }

        let mut seen = HashSet::new();
        for lesson in self.modules.iter().flat_map(|m| m.lessons.iter()) {
            if lesson.id.trim().is_empty() {
                return Err(AppError::ValidationError(
                    "Lesson id must not be empty".to_string(),
                ));
            }
            if !seen.insert(lesson.id.as_str()) {
                return Err(AppError::ValidationError(format!(
                    "Lesson '{}' appears in more than one place",
                    lesson.id
                )));
            }
        }

        Ok(())
    }

    /// Modules sorted by their order value.
    pub fn ordered_modules(&self) -> Vec<&CourseModule> {
        let mut modules: Vec<&CourseModule> = self.modules.iter().collect();
        modules.sort_by_key(|m| m.order);
        modules
    }

    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.modules.iter().flat_map(|m| m.lessons.iter())
    }

    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    pub fn contains_lesson(&self, lesson_id: &str) -> bool {
        self.lessons().any(|l| l.id == lesson_id)
    }

    pub fn duration_minutes(&self) -> u32 {
        self.modules
            .iter()
            .fold(0u32, |total, m| total.saturating_add(m.duration_minutes()))
    }

    pub fn add_lesson(&mut self, module_order: u32, lesson: Lesson) -> AppResult<()> {
        if self.contains_lesson(&lesson.id) {
            return Err(AppError::AlreadyExists(format!(
                "Lesson '{}' already exists in course '{}'",
                lesson.id, self.id
            )));
        }

        let module = self
            .modules
            .iter_mut()
            .find(|m| m.order == module_order)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Module {} not found in course '{}'",
                    module_order, self.id
                ))
            })?;

        module.lessons.push(lesson);
        self.modified_at = Some(Utc::now());
        Ok(())
    }
}
