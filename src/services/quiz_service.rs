use std::sync::Arc;

use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::Quiz,
        dto::{request::CreateQuizRequest, response::QuizForTaking},
    },
    repositories::{CourseRepository, QuizRepository},
};

pub struct QuizService {
    repository: Arc<dyn QuizRepository>,
    courses: Arc<dyn CourseRepository>,
}

impl QuizService {
    pub fn new(repository: Arc<dyn QuizRepository>, courses: Arc<dyn CourseRepository>) -> Self {
        Self {
            repository,
            courses,
        }
    }

    pub async fn get_quiz(&self, id: &str) -> AppResult<Quiz> {
        let quiz = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", id)))?;

        Ok(quiz)
    }

    /// The quiz as shown to a learner: no answer key.
    pub async fn quiz_for_taking(&self, id: &str) -> AppResult<QuizForTaking> {
        self.get_quiz(id).await.map(QuizForTaking::from)
    }

    pub async fn create_quiz(&self, request: CreateQuizRequest, created_by: &str) -> AppResult<Quiz> {
        request.validate()?;

        let quiz = request.into_quiz(created_by);
        quiz.validate_answer_key()?;
        self.check_lesson_link(&quiz).await?;

        let quiz = self.repository.create(quiz).await?;
        log::info!("Quiz {} created by {}", quiz.id, created_by);
        Ok(quiz)
    }

    /// A quiz linked to a lesson must name a course that contains it.
    async fn check_lesson_link(&self, quiz: &Quiz) -> AppResult<()> {
        match (&quiz.course_id, &quiz.lesson_id) {
            (None, None) => Ok(()),
            (None, Some(_)) => Err(AppError::ValidationError(
                "A quiz linked to a lesson must also name its course".to_string(),
            )),
            (Some(course_id), lesson_id) => {
                let course = self
                    .courses
                    .find_by_id(course_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Course '{}' not found", course_id)))?;

                match lesson_id {
                    Some(lesson_id) if !course.contains_lesson(lesson_id) => {
                        Err(AppError::UnknownLesson(format!(
                            "Lesson '{}' is not part of course '{}'",
                            lesson_id, course_id
                        )))
                    }
                    _ => Ok(()),
                }
            }
        }
    }
}
