pub mod auth_handler;
pub mod course_handler;
pub mod enrollment_handler;
pub mod graphql_handler;
pub mod quiz_handler;
pub mod user_handler;

use actix_web::web;

/// Registers every HTTP route. The GraphQL schema must be present as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(user_handler::configure)
        .configure(auth_handler::configure)
        .configure(course_handler::configure)
        .configure(enrollment_handler::configure)
        .configure(quiz_handler::configure)
        .configure(graphql_handler::configure);
}
