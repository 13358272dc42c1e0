use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::{
    Difficulty, Enrollment, EnrollmentStatus, Question, QuestionType, Quiz, QuizAttempt, Role,
    User,
};

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct PrincipalDto {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for PrincipalDto {
    fn from(user: User) -> Self {
        PrincipalDto {
            id: user.id,
            display_name: user.display_name,
            email: user.email,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub principal: PrincipalDto,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct EnrollmentProgress {
    pub learner_id: String,
    pub course_id: String,
    pub progress: u8,
    pub status: EnrollmentStatus,
    pub completed_lesson_ids: Vec<String>,
    pub enrolled_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl EnrollmentProgress {
    /// Snapshot with an explicitly derived progress value.
    pub fn with_progress(enrollment: Enrollment, progress: u8) -> Self {
        EnrollmentProgress {
            learner_id: enrollment.learner_id,
            course_id: enrollment.course_id,
            progress,
            status: enrollment.status,
            completed_lesson_ids: enrollment.completed_lesson_ids.into_iter().collect(),
            enrolled_at: enrollment.enrolled_at,
            completed_at: enrollment.completed_at,
        }
    }
}

impl From<Enrollment> for EnrollmentProgress {
    fn from(enrollment: Enrollment) -> Self {
        let progress = enrollment.progress();
        EnrollmentProgress::with_progress(enrollment, progress)
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuizSubmissionResponse {
    pub attempt_id: String,
    pub score: f64,
    pub passed: bool,
    pub attempt_ordinal: u32,
    pub points_awarded: u32,
    pub points_possible: u32,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_progress: Option<EnrollmentProgress>,
}

impl QuizSubmissionResponse {
    pub fn new(attempt: &QuizAttempt, lesson_progress: Option<EnrollmentProgress>) -> Self {
        QuizSubmissionResponse {
            attempt_id: attempt.id.clone(),
            score: attempt.score,
            passed: attempt.passed,
            attempt_ordinal: attempt.ordinal,
            points_awarded: attempt.points_awarded,
            points_possible: attempt.points_possible,
            timed_out: attempt.timed_out,
            lesson_progress,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuizAttemptSummary {
    pub id: String,
    pub quiz_id: String,
    pub ordinal: u32,
    pub score: f64,
    pub passed: bool,
    pub timed_out: bool,
    pub submitted_at: DateTime<Utc>,
}

impl From<QuizAttempt> for QuizAttemptSummary {
    fn from(attempt: QuizAttempt) -> Self {
        QuizAttemptSummary {
            id: attempt.id,
            quiz_id: attempt.quiz_id,
            ordinal: attempt.ordinal,
            score: attempt.score,
            passed: attempt.passed,
            timed_out: attempt.timed_out,
            submitted_at: attempt.submitted_at,
        }
    }
}

/// Question as shown to a learner: the answer key is left out.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuestionForTaking {
    pub id: String,
    pub prompt: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub points: u32,
    pub difficulty: Difficulty,
}

impl From<Question> for QuestionForTaking {
    fn from(question: Question) -> Self {
        QuestionForTaking {
            id: question.id,
            prompt: question.prompt,
            question_type: question.question_type,
            options: question.options,
            points: question.points,
            difficulty: question.difficulty,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuizForTaking {
    pub id: String,
    pub title: String,
    pub time_limit_seconds: Option<u32>,
    pub passing_score: u8,
    pub max_attempts: Option<u32>,
    pub questions: Vec<QuestionForTaking>,
}

impl From<Quiz> for QuizForTaking {
    fn from(quiz: Quiz) -> Self {
        QuizForTaking {
            id: quiz.id,
            title: quiz.title,
            time_limit_seconds: quiz.time_limit_seconds,
            passing_score: quiz.passing_score,
            max_attempts: quiz.max_attempts,
            questions: quiz.questions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, SimpleObject)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        MessageResponse {
            message: message.into(),
        }
    }
}
