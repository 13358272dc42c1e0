use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{Course, Enrollment, EnrollmentStatus},
        dto::response::EnrollmentProgress,
    },
    repositories::{CourseRepository, EnrollmentRepository},
    services::key_lock::{pair_key, KeyedLocks},
};

/// A versioned write that lost a race is retried this many times in total.
const WRITE_ATTEMPTS: usize = 2;

pub struct EnrollmentService {
    enrollments: Arc<dyn EnrollmentRepository>,
    courses: Arc<dyn CourseRepository>,
    locks: KeyedLocks,
}

impl EnrollmentService {
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        courses: Arc<dyn CourseRepository>,
    ) -> Self {
        Self {
            enrollments,
            courses,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn enroll(&self, learner_id: &str, course_id: &str) -> AppResult<Enrollment> {
        self.course(course_id).await?;
        let _guard = self.locks.lock(pair_key(learner_id, course_id)).await;

        let already_enrolled = || {
            AppError::AlreadyEnrolled(format!(
                "Learner '{}' is already enrolled in '{}'",
                learner_id, course_id
            ))
        };

        let fresh = Enrollment::new(learner_id, course_id);
        let stored = match self.enrollments.find(learner_id, course_id).await? {
            Some(existing) if existing.is_blocking() => return Err(already_enrolled()),
            Some(dropped) => self.enrollments.replace(fresh, dropped.version).await,
            None => self.enrollments.insert(fresh).await,
        };

        match stored {
            Ok(enrollment) => {
                log::info!("Enrolled learner {} in course {}", learner_id, course_id);
                Ok(enrollment)
            }
            Err(AppError::Conflict(_)) => Err(already_enrolled()),
            Err(e) => Err(e),
        }
    }

    /// Adds the lesson to the completed set and refreshes progress.
    /// Completing an already completed lesson leaves the record untouched.
    pub async fn mark_lesson_complete(
        &self,
        learner_id: &str,
        course_id: &str,
        lesson_id: &str,
    ) -> AppResult<Enrollment> {
        let _guard = self.locks.lock(pair_key(learner_id, course_id)).await;
        let course = self.courses.find_by_id(course_id).await?;

        let updated = self
            .update_with_retry(learner_id, course_id, |enrollment| {
                match enrollment.status {
                    EnrollmentStatus::Active => {}
                    EnrollmentStatus::Dropped => return Err(not_enrolled(learner_id, course_id)),
                    EnrollmentStatus::Completed => {
                        return Err(AppError::EnrollmentComplete(format!(
                            "Learner '{}' has already completed '{}'",
                            learner_id, course_id
                        )))
                    }
                }

                let course = course.as_ref().ok_or_else(|| course_not_found(course_id))?;
                if !course.contains_lesson(lesson_id) {
                    return Err(AppError::UnknownLesson(format!(
                        "Lesson '{}' is not part of course '{}'",
                        lesson_id, course_id
                    )));
                }

                let before = (enrollment.progress(), enrollment.status);
                let added = enrollment.record_lesson(lesson_id);
                enrollment.recompute(course);
                Ok(added || before != (enrollment.progress(), enrollment.status))
            })
            .await?
            .ok_or_else(|| not_enrolled(learner_id, course_id))?;

        if updated.status == EnrollmentStatus::Completed {
            log::info!("Learner {} completed course {}", learner_id, course_id);
        }

        Ok(updated)
    }

    /// Removes the record whatever its status.
    pub async fn unenroll(&self, learner_id: &str, course_id: &str) -> AppResult<()> {
        let _guard = self.locks.lock(pair_key(learner_id, course_id)).await;

        if !self.enrollments.delete(learner_id, course_id).await? {
            return Err(not_enrolled(learner_id, course_id));
        }

        log::info!("Unenrolled learner {} from course {}", learner_id, course_id);
        Ok(())
    }

    /// Keeps the record for history; a later enroll replaces it.
    pub async fn drop_course(&self, learner_id: &str, course_id: &str) -> AppResult<Enrollment> {
        let _guard = self.locks.lock(pair_key(learner_id, course_id)).await;

        self.update_with_retry(learner_id, course_id, |enrollment| match enrollment.status {
            EnrollmentStatus::Active => {
                enrollment.status = EnrollmentStatus::Dropped;
                Ok(true)
            }
            EnrollmentStatus::Dropped => Err(not_enrolled(learner_id, course_id)),
            EnrollmentStatus::Completed => Err(AppError::EnrollmentComplete(format!(
                "Learner '{}' has already completed '{}'",
                learner_id, course_id
            ))),
        })
        .await?
        .ok_or_else(|| not_enrolled(learner_id, course_id))
    }

    pub async fn progress(&self, learner_id: &str, course_id: &str) -> AppResult<EnrollmentProgress> {
        let enrollment = self
            .enrollments
            .find(learner_id, course_id)
            .await?
            .ok_or_else(|| not_enrolled(learner_id, course_id))?;

        self.with_current_progress(enrollment).await
    }

    pub async fn list_for_learner(&self, learner_id: &str) -> AppResult<Vec<EnrollmentProgress>> {
        let enrollments = self.enrollments.list_by_learner(learner_id).await?;

        let mut items = Vec::with_capacity(enrollments.len());
        for enrollment in enrollments {
            items.push(self.with_current_progress(enrollment).await?);
        }
        Ok(items)
    }

    /// Brings every active enrollment of `course` in line with its current
    /// lesson set. Returns how many records changed.
    pub async fn recompute_for_course(&self, course: &Course) -> AppResult<usize> {
        let active = self.enrollments.list_active_by_course(&course.id).await?;
        let mut changed = 0;

        for snapshot in active {
            let _guard = self
                .locks
                .lock(pair_key(&snapshot.learner_id, &course.id))
                .await;

            let result = self
                .update_with_retry(&snapshot.learner_id, &course.id, |enrollment| {
                    if enrollment.status != EnrollmentStatus::Active {
                        return Ok(false);
                    }
                    let before = (enrollment.progress(), enrollment.status);
                    enrollment.recompute(course);
                    Ok(before != (enrollment.progress(), enrollment.status))
                })
                .await;

            match result {
                Ok(Some(updated))
                    if (updated.progress(), updated.status)
                        != (snapshot.progress(), snapshot.status) =>
                {
                    changed += 1
                }
                Ok(_) => {}
                Err(e) => log::warn!(
                    "Could not recompute progress of {} in {}: {}",
                    snapshot.learner_id,
                    course.id,
                    e
                ),
            }
        }

        log::debug!("Recomputed {} enrollment(s) for course {}", changed, course.id);
        Ok(changed)
    }

    /// Loads the record, applies `apply` and writes it back against the loaded
    /// version. `apply` returns whether anything changed; unchanged records are
    /// not written. A lost race reloads and reapplies once before giving up.
    async fn update_with_retry<F>(
        &self,
        learner_id: &str,
        course_id: &str,
        mut apply: F,
    ) -> AppResult<Option<Enrollment>>
    where
        F: FnMut(&mut Enrollment) -> AppResult<bool> + Send,
    {
        for attempt in 1..=WRITE_ATTEMPTS {
            let Some(mut enrollment) = self.enrollments.find(learner_id, course_id).await? else {
                return Ok(None);
            };

            let expected_version = enrollment.version;
            if !apply(&mut enrollment)? {
                return Ok(Some(enrollment));
            }

            match self.enrollments.replace(enrollment, expected_version).await {
                Ok(saved) => return Ok(Some(saved)),
                Err(AppError::Conflict(reason)) => {
                    log::warn!("Write attempt {} lost a race: {}", attempt, reason);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Transient(format!(
            "Enrollment of '{}' in '{}' is busy, try again",
            learner_id, course_id
        )))
    }

    async fn with_current_progress(&self, enrollment: Enrollment) -> AppResult<EnrollmentProgress> {
        match self.courses.find_by_id(&enrollment.course_id).await? {
            Some(course) => {
                let progress = enrollment.derived_progress(&course);
                Ok(EnrollmentProgress::with_progress(enrollment, progress))
            }
            None => Ok(EnrollmentProgress::from(enrollment)),
        }
    }

    async fn course(&self, course_id: &str) -> AppResult<Course> {
        self.courses
            .find_by_id(course_id)
            .await?
            .ok_or_else(|| course_not_found(course_id))
    }
}

fn not_enrolled(learner_id: &str, course_id: &str) -> AppError {
    AppError::NotEnrolled(format!(
        "Learner '{}' has no active enrollment in '{}'",
        learner_id, course_id
    ))
}

fn course_not_found(course_id: &str) -> AppError {
    AppError::NotFound(format!("Course '{}' not found", course_id))
}
