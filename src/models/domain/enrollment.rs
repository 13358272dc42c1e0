use std::collections::BTreeSet;

use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::course::Course;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Dropped => "dropped",
        }
    }
}

/// A learner's relationship to a course.
///
/// `progress` is a cached projection of `completed_lesson_ids` over the
/// course's current lesson set. It is only ever written by [`Enrollment::recompute`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Enrollment {
    pub id: String,
    pub learner_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
    progress: u8,
    pub completed_lesson_ids: BTreeSet<String>,
    pub version: i64,
    pub enrolled_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    pub fn new(learner_id: &str, course_id: &str) -> Self {
        Enrollment {
            id: Uuid::new_v4().to_string(),
            learner_id: learner_id.to_string(),
            course_id: course_id.to_string(),
            status: EnrollmentStatus::Active,
            progress: 0,
            completed_lesson_ids: BTreeSet::new(),
            version: 0,
            enrolled_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Blocks a new enrollment for the same pair.
    pub fn is_blocking(&self) -> bool {
        matches!(
            self.status,
            EnrollmentStatus::Active | EnrollmentStatus::Completed
        )
    }

    /// Records a completed lesson. Returns `false` when it was already recorded.
    pub fn record_lesson(&mut self, lesson_id: &str) -> bool {
        self.completed_lesson_ids.insert(lesson_id.to_string())
    }

    /// Refreshes the cached progress from the completed set and the course's
    /// lesson list. Completed enrollments are terminal and never change.
    pub fn recompute(&mut self, course: &Course) {
        if self.status != EnrollmentStatus::Active {
            return;
        }

        self.progress = progress_percent(self.counted_lessons(course), course.lesson_count());

        if self.progress >= 100 {
            self.status = EnrollmentStatus::Completed;
            self.completed_at = Some(Utc::now());
        }
    }

    /// Progress derived against `course` without touching the record.
    pub fn derived_progress(&self, course: &Course) -> u8 {
        match self.status {
            EnrollmentStatus::Completed => 100,
            _ => progress_percent(self.counted_lessons(course), course.lesson_count()),
        }
    }

    fn counted_lessons(&self, course: &Course) -> usize {
        course
            .lessons()
            .filter(|l| self.completed_lesson_ids.contains(&l.id))
            .count()
    }
}

/// `floor(completed / total * 100)`; a course without lessons reports 0.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    ((completed * 100) / total) as u8
}
