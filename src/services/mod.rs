pub mod auth_service;
pub mod course_service;
pub mod enrollment_service;
pub mod key_lock;
pub mod quiz_attempt_service;
pub mod quiz_service;
pub mod user_service;

pub use auth_service::AuthService;
pub use course_service::CourseService;
pub use enrollment_service::EnrollmentService;
pub use quiz_attempt_service::QuizAttemptService;
pub use quiz_service::QuizService;
pub use user_service::UserService;
