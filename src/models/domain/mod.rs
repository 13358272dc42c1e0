pub mod course;
pub mod enrollment;
pub mod quiz;
pub mod quiz_attempt;
pub mod user;

pub use course::{Course, CourseLevel, CourseModule, Lesson, LessonType};
pub use enrollment::{Enrollment, EnrollmentStatus};
pub use quiz::{Difficulty, Question, QuestionType, Quiz};
pub use quiz_attempt::{QuestionResult, QuizAttempt, SubmittedAnswer};
pub use user::{Role, User};
