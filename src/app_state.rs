use std::sync::Arc;

use crate::{
    auth::{CredentialValidator, IdentityStore, RoutePolicy, TokenIssuer},
    config::Config,
    db::Database,
    errors::AppResult,
    models::domain::User,
    repositories::{
        memory::{
            InMemoryCourseRepository, InMemoryEnrollmentRepository, InMemoryQuizAttemptRepository,
            InMemoryQuizRepository, InMemoryUserRepository,
        },
        CourseRepository, EnrollmentRepository, MongoCourseRepository, MongoEnrollmentRepository,
        MongoQuizAttemptRepository, MongoQuizRepository, MongoUserRepository,
        QuizAttemptRepository, QuizRepository, UserRepository,
    },
    services::{
        AuthService, CourseService, EnrollmentService, QuizAttemptService, QuizService,
        UserService,
    },
};

/// One handle per store concern. `identities` and `users` point at the same store.
pub struct Repositories {
    pub identities: Arc<dyn IdentityStore>,
    pub users: Arc<dyn UserRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub quiz_attempts: Arc<dyn QuizAttemptRepository>,
}

impl Repositories {
    pub fn mongo(db: &Database) -> Self {
        let users = Arc::new(MongoUserRepository::new(db));
        Self {
            identities: users.clone(),
            users,
            courses: Arc::new(MongoCourseRepository::new(db)),
            enrollments: Arc::new(MongoEnrollmentRepository::new(db)),
            quizzes: Arc::new(MongoQuizRepository::new(db)),
            quiz_attempts: Arc::new(MongoQuizAttemptRepository::new(db)),
        }
    }

    pub fn in_memory() -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        Self {
            identities: users.clone(),
            users,
            courses: Arc::new(InMemoryCourseRepository::new()),
            enrollments: Arc::new(InMemoryEnrollmentRepository::new()),
            quizzes: Arc::new(InMemoryQuizRepository::new()),
            quiz_attempts: Arc::new(InMemoryQuizAttemptRepository::new()),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        self.users.ensure_indexes().await?;
        self.courses.ensure_indexes().await?;
        self.enrollments.ensure_indexes().await?;
        self.quizzes.ensure_indexes().await?;
        self.quiz_attempts.ensure_indexes().await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub course_service: Arc<CourseService>,
    pub enrollment_service: Arc<EnrollmentService>,
    pub quiz_service: Arc<QuizService>,
    pub quiz_attempt_service: Arc<QuizAttemptService>,
    pub token_issuer: Arc<TokenIssuer>,
    pub route_policy: Arc<RoutePolicy>,
    pub config: Arc<Config>,
    pub database: Option<Database>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let repositories = Repositories::mongo(&db);
        repositories.ensure_indexes().await?;

        Ok(Self::assemble(config, repositories, Some(db)))
    }

    /// State over process-local stores; nothing survives a restart.
    pub fn in_memory(config: Config) -> Self {
        Self::assemble(config, Repositories::in_memory(), None)
    }

    pub fn assemble(config: Config, repositories: Repositories, database: Option<Database>) -> Self {
        let token_issuer = Arc::new(TokenIssuer::new(
            &config.jwt_secret,
            config.token_expiration_minutes,
        ));
        let route_policy = Arc::new(RoutePolicy::default());

        let auth_service = Arc::new(AuthService::new(
            CredentialValidator::new(
                repositories.identities,
                config.password_min_length,
                config.bcrypt_cost,
            ),
            Arc::clone(&token_issuer),
            Arc::clone(&route_policy),
            Arc::clone(&repositories.users),
            config.bcrypt_cost,
        ));
        let user_service = Arc::new(UserService::new(repositories.users));

        let enrollment_service = Arc::new(EnrollmentService::new(
            repositories.enrollments,
            Arc::clone(&repositories.courses),
        ));
        let course_service = Arc::new(CourseService::new(
            Arc::clone(&repositories.courses),
            Arc::clone(&enrollment_service),
        ));
        let quiz_service = Arc::new(QuizService::new(
            Arc::clone(&repositories.quizzes),
            repositories.courses,
        ));
        let quiz_attempt_service = Arc::new(QuizAttemptService::new(
            repositories.quizzes,
            repositories.quiz_attempts,
            Arc::clone(&enrollment_service),
        ));

        Self {
            auth_service,
            user_service,
            course_service,
            enrollment_service,
            quiz_service,
            quiz_attempt_service,
            token_issuer,
            route_policy,
            config: Arc::new(config),
            database,
        }
    }

    /// Creates or promotes the configured admin. Returns `None` when no admin is configured.
    pub async fn seed_admin(&self) -> AppResult<Option<User>> {
        let (Some(email), Some(password)) = (&self.config.admin_email, &self.config.admin_password)
        else {
            log::debug!("ADMIN_EMAIL/ADMIN_PASSWORD not set; skipping admin seed");
            return Ok(None);
        };

        let admin = self
            .user_service
            .ensure_admin(email, password, self.config.bcrypt_cost)
            .await?;
        Ok(Some(admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::Role;

    #[test]
    fn test_app_state_is_cloneable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_seed_admin_from_config() {
        let state = AppState::in_memory(Config::test_config());

        let admin = state.seed_admin().await.unwrap().expect("admin configured");
        assert_eq!(admin.email, "admin@seeyc.com");
        assert_eq!(admin.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_seed_admin_skipped_without_config() {
        let mut config = Config::test_config();
        config.admin_email = None;
        let state = AppState::in_memory(config);

        assert!(state.seed_admin().await.unwrap().is_none());
    }
}
