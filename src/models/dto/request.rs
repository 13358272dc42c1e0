use async_graphql::InputObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{
    Course, CourseLevel, CourseModule, Lesson, LessonType, Question, Quiz, Role, SubmittedAnswer,
};

/// Raw login input. Format rules are applied by the credential validator,
/// since the minimum password length is configurable.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Reserved for a second authentication factor; currently ignored.
    #[serde(default)]
    pub second_factor: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorizeRequest {
    pub path: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1, max = 100))]
    pub category: String,

    pub level: CourseLevel,

    #[serde(default)]
    pub modules: Vec<CourseModule>,
}

impl CreateCourseRequest {
    pub fn into_course(self) -> Course {
        Course {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title,
            category: self.category,
            level: self.level,
            modules: self.modules,
            created_at: Some(Utc::now()),
            modified_at: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AddLessonRequest {
    #[validate(length(min = 1, max = 100))]
    pub id: String,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    pub lesson_type: LessonType,

    pub duration_minutes: u32,

    #[serde(default)]
    pub preview: bool,
}

impl From<AddLessonRequest> for Lesson {
    fn from(request: AddLessonRequest) -> Self {
        Lesson {
            id: request.id,
            title: request.title,
            lesson_type: request.lesson_type,
            duration_minutes: request.duration_minutes,
            preview: request.preview,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct EnrollRequest {
    #[validate(length(min = 1))]
    pub learner_id: String,

    #[validate(length(min = 1))]
    pub course_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LessonCompletionRequest {
    #[validate(length(min = 1))]
    pub learner_id: String,

    #[validate(length(min = 1))]
    pub course_id: String,

    #[validate(length(min = 1))]
    pub lesson_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(default)]
    pub course_id: Option<String>,

    #[serde(default)]
    pub lesson_id: Option<String>,

    #[validate(length(min = 1, message = "A quiz needs at least one question"))]
    pub questions: Vec<Question>,

    #[serde(default)]
    pub time_limit_seconds: Option<u32>,

    #[validate(range(max = 100))]
    pub passing_score: u8,

    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl CreateQuizRequest {
    pub fn into_quiz(self, created_by: &str) -> Quiz {
        let mut quiz = Quiz::new(&self.title, created_by, self.questions, self.passing_score);
        quiz.course_id = self.course_id;
        quiz.lesson_id = self.lesson_id;
        quiz.time_limit_seconds = self.time_limit_seconds;
        quiz.max_attempts = self.max_attempts;
        quiz
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, InputObject)]
pub struct AnswerInput {
    pub question_id: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl From<AnswerInput> for SubmittedAnswer {
    fn from(input: AnswerInput) -> Self {
        SubmittedAnswer {
            question_id: input.question_id,
            values: input.values,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, InputObject)]
pub struct SubmitQuizAttemptInput {
    #[validate(length(min = 1))]
    pub learner_id: String,

    #[validate(length(min = 1))]
    pub quiz_id: String,

    #[serde(default)]
    pub answers: Vec<AnswerInput>,

    /// When the learner opened the quiz; checked against the quiz time limit.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::QuestionType;

    #[test]
    fn test_register_request_rejects_bad_email() {
        let request = RegisterRequest {
            display_name: "Ada".to_string(),
            email: "not-an-email".to_string(),
            password: "secret-pass".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_register_request_rejects_empty_name() {
        let request = RegisterRequest {
            display_name: "".to_string(),
            email: "ada@example.com".to_string(),
            password: "secret-pass".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_login_request_second_factor_is_optional() {
        let request: LoginRequest =
            serde_json::from_str(r#"{"email":"a@b.com","password":"pw1234"}"#).unwrap();
        assert!(request.second_factor.is_none());
    }

    #[test]
    fn test_create_quiz_request_requires_questions() {
        let request = CreateQuizRequest {
            title: "Empty".to_string(),
            course_id: None,
            lesson_id: None,
            questions: vec![],
            time_limit_seconds: None,
            passing_score: 50,
            max_attempts: Some(2),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_quiz_request_builds_quiz() {
        let request = CreateQuizRequest {
            title: "Basics".to_string(),
            course_id: Some("c1".to_string()),
            lesson_id: Some("l3".to_string()),
            questions: vec![Question {
                id: "q1".to_string(),
                prompt: "2 + 2?".to_string(),
                question_type: QuestionType::ShortAnswer,
                options: vec![],
                correct_answers: vec!["4".to_string()],
                points: 1,
                difficulty: Default::default(),
            }],
            time_limit_seconds: Some(600),
            passing_score: 70,
            max_attempts: Some(3),
        };
        assert!(request.validate().is_ok());

        let quiz = request.into_quiz("instructor-1");
        assert_eq!(quiz.created_by, "instructor-1");
        assert_eq!(quiz.lesson_id.as_deref(), Some("l3"));
        assert_eq!(quiz.max_attempts, Some(3));
        assert_eq!(quiz.time_limit_seconds, Some(600));
    }

    #[test]
    fn test_add_lesson_request_converts_to_lesson() {
        let request = AddLessonRequest {
            id: "l9".to_string(),
            title: "Wrap-up".to_string(),
            lesson_type: LessonType::Resource,
            duration_minutes: 5,
            preview: true,
        };
        let lesson: Lesson = request.into();
        assert_eq!(lesson.id, "l9");
        assert!(lesson.preview);
    }
}
