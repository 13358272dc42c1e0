//! Process-local repositories backed by `RwLock<HashMap>`.
//!
//! They honour the same uniqueness and versioning contracts as the Mongo
//! implementations and back the test suites.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    auth::IdentityStore,
    errors::{AppError, AppResult},
    models::domain::{
        user::normalize_email, Course, Enrollment, EnrollmentStatus, Quiz, QuizAttempt, Role,
        User,
    },
    repositories::{
        CourseRepository, EnrollmentRepository, QuizAttemptRepository, QuizRepository,
        UserRepository,
    },
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::AlreadyExists(format!(
                "A user with email '{}' already exists",
                user.email
            )));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn update_role(&self, id: &str, role: Role) -> AppResult<User> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", id)))?;
        user.role = role;
        Ok(user.clone())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCourseRepository {
    courses: Arc<RwLock<HashMap<String, Course>>>,
}

impl InMemoryCourseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseRepository for InMemoryCourseRepository {
    async fn create(&self, course: Course) -> AppResult<Course> {
        let mut courses = self.courses.write().await;
        if courses.contains_key(&course.id) {
            return Err(AppError::AlreadyExists(format!(
                "Course '{}' already exists",
                course.id
            )));
        }
        courses.insert(course.id.clone(), course.clone());
        Ok(course)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Course>> {
        Ok(self.courses.read().await.get(id).cloned())
    }

    async fn update(&self, course: Course) -> AppResult<Course> {
        let mut courses = self.courses.write().await;
        if !courses.contains_key(&course.id) {
            return Err(AppError::NotFound(format!(
                "Course '{}' not found",
                course.id
            )));
        }
        courses.insert(course.id.clone(), course.clone());
        Ok(course)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

type PairKey = (String, String);

fn pair(learner_id: &str, other_id: &str) -> PairKey {
    (learner_id.to_string(), other_id.to_string())
}

#[derive(Default)]
pub struct InMemoryEnrollmentRepository {
    enrollments: Arc<RwLock<HashMap<PairKey, Enrollment>>>,
}

impl InMemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryEnrollmentRepository {
    async fn find(&self, learner_id: &str, course_id: &str) -> AppResult<Option<Enrollment>> {
        let enrollments = self.enrollments.read().await;
        Ok(enrollments.get(&pair(learner_id, course_id)).cloned())
    }

    async fn insert(&self, enrollment: Enrollment) -> AppResult<Enrollment> {
        let mut enrollments = self.enrollments.write().await;
        let key = pair(&enrollment.learner_id, &enrollment.course_id);
        if enrollments.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "Enrollment of '{}' in '{}' was modified concurrently",
                enrollment.learner_id, enrollment.course_id
            )));
        }
        enrollments.insert(key, enrollment.clone());
        Ok(enrollment)
    }

    async fn replace(
        &self,
        mut enrollment: Enrollment,
        expected_version: i64,
    ) -> AppResult<Enrollment> {
        let mut enrollments = self.enrollments.write().await;
        let key = pair(&enrollment.learner_id, &enrollment.course_id);

        match enrollments.get(&key) {
            Some(current) if current.version == expected_version => {}
            _ => {
                return Err(AppError::Conflict(format!(
                    "Enrollment of '{}' in '{}' was modified concurrently",
                    enrollment.learner_id, enrollment.course_id
                )))
            }
        }

        enrollment.version = expected_version + 1;
        enrollments.insert(key, enrollment.clone());
        Ok(enrollment)
    }

    async fn delete(&self, learner_id: &str, course_id: &str) -> AppResult<bool> {
        let mut enrollments = self.enrollments.write().await;
        Ok(enrollments.remove(&pair(learner_id, course_id)).is_some())
    }

    async fn list_by_learner(&self, learner_id: &str) -> AppResult<Vec<Enrollment>> {
        let enrollments = self.enrollments.read().await;
        let mut items: Vec<_> = enrollments
            .values()
            .filter(|e| e.learner_id == learner_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.enrolled_at.cmp(&b.enrolled_at));
        Ok(items)
    }

    async fn list_active_by_course(&self, course_id: &str) -> AppResult<Vec<Enrollment>> {
        let enrollments = self.enrollments.read().await;
        Ok(enrollments
            .values()
            .filter(|e| e.course_id == course_id && e.status == EnrollmentStatus::Active)
            .cloned()
            .collect())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuizRepository {
    quizzes: Arc<RwLock<HashMap<String, Quiz>>>,
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz> {
        let mut quizzes = self.quizzes.write().await;
        if quizzes.contains_key(&quiz.id) {
            return Err(AppError::AlreadyExists(format!(
                "Quiz '{}' already exists",
                quiz.id
            )));
        }
        quizzes.insert(quiz.id.clone(), quiz.clone());
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        Ok(self.quizzes.read().await.get(id).cloned())
    }

    async fn find_by_course(&self, course_id: &str) -> AppResult<Vec<Quiz>> {
        let quizzes = self.quizzes.read().await;
        let mut items: Vec<_> = quizzes
            .values()
            .filter(|q| q.course_id.as_deref() == Some(course_id))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(items)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQuizAttemptRepository {
    attempts: Arc<RwLock<HashMap<PairKey, Vec<QuizAttempt>>>>,
}

impl InMemoryQuizAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryQuizAttemptRepository {
    async fn append(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        let mut attempts = self.attempts.write().await;
        let log = attempts
            .entry(pair(&attempt.learner_id, &attempt.quiz_id))
            .or_default();

        if log.iter().any(|a| a.ordinal == attempt.ordinal) {
            return Err(AppError::Conflict(format!(
                "Attempt {} of quiz '{}' was already recorded",
                attempt.ordinal, attempt.quiz_id
            )));
        }

        log.push(attempt.clone());
        log.sort_by_key(|a| a.ordinal);
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts.values().flatten().find(|a| a.id == id).cloned())
    }

    async fn count(&self, learner_id: &str, quiz_id: &str) -> AppResult<u32> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .get(&pair(learner_id, quiz_id))
            .map_or(0, |log| log.len() as u32))
    }

    async fn list(&self, learner_id: &str, quiz_id: &str) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .get(&pair(learner_id, quiz_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}
