use std::sync::Arc;

use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{Course, Lesson},
        dto::request::{AddLessonRequest, CreateCourseRequest},
    },
    repositories::CourseRepository,
    services::{enrollment_service::EnrollmentService, key_lock::KeyedLocks},
};

pub struct CourseService {
    repository: Arc<dyn CourseRepository>,
    enrollments: Arc<EnrollmentService>,
    locks: KeyedLocks,
}

impl CourseService {
    pub fn new(repository: Arc<dyn CourseRepository>, enrollments: Arc<EnrollmentService>) -> Self {
        Self {
            repository,
            enrollments,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn create_course(&self, request: CreateCourseRequest) -> AppResult<Course> {
        request.validate()?;

        let course = request.into_course();
        course.validate_structure()?;

        let course = self.repository.create(course).await?;
        log::info!("Created course {} ({})", course.id, course.title);
        Ok(course)
    }

    pub async fn get_course(&self, id: &str) -> AppResult<Course> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course '{}' not found", id)))
    }

    /// Appends a lesson to a module, then recomputes every active enrollment
    /// against the new lesson set.
    pub async fn add_lesson(
        &self,
        course_id: &str,
        module_order: u32,
        request: AddLessonRequest,
    ) -> AppResult<Course> {
        request.validate()?;

        let course = {
            let _guard = self.locks.lock(course_id.to_string()).await;

            let mut course = self.get_course(course_id).await?;
            course.add_lesson(module_order, Lesson::from(request))?;
            course.validate_structure()?;
            self.repository.update(course).await?
        };

        let changed = self.enrollments.recompute_for_course(&course).await?;
        log::info!(
            "Added lesson to course {} module {}; {} enrollment(s) recomputed",
            course.id,
            module_order,
            changed
        );

        Ok(course)
    }
}
