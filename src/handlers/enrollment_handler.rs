use actix_web::{delete, get, post, web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::{require_self_or_admin, AuthenticatedUser},
    errors::AppError,
    models::dto::{
        request::{EnrollRequest, LessonCompletionRequest},
        response::{EnrollmentProgress, MessageResponse},
    },
};

#[derive(Debug, Deserialize)]
pub struct LearnerQuery {
    pub learner_id: Option<String>,
}

#[post("/api/enrollments")]
async fn enroll(
    state: web::Data<AppState>,
    request: web::Json<EnrollRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    require_self_or_admin(&auth.0, &request.learner_id)?;

    let enrollment = state
        .enrollment_service
        .enroll(&request.learner_id, &request.course_id)
        .await?;
    Ok(HttpResponse::Created().json(EnrollmentProgress::from(enrollment)))
}

#[get("/api/enrollments")]
async fn list_enrollments(
    state: web::Data<AppState>,
    query: web::Query<LearnerQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let learner_id = query.learner_id.as_deref().unwrap_or(&auth.0.sub);
    require_self_or_admin(&auth.0, learner_id)?;

    let enrollments = state.enrollment_service.list_for_learner(learner_id).await?;
    Ok(HttpResponse::Ok().json(enrollments))
}

#[delete("/api/enrollments/{learner_id}/{course_id}")]
async fn unenroll(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (learner_id, course_id) = path.into_inner();
    require_self_or_admin(&auth.0, &learner_id)?;

    state
        .enrollment_service
        .unenroll(&learner_id, &course_id)
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Enrollment removed")))
}

#[post("/api/enrollments/{learner_id}/{course_id}/drop")]
async fn drop_course(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (learner_id, course_id) = path.into_inner();
    require_self_or_admin(&auth.0, &learner_id)?;

    let enrollment = state
        .enrollment_service
        .drop_course(&learner_id, &course_id)
        .await?;
    Ok(HttpResponse::Ok().json(EnrollmentProgress::from(enrollment)))
}

#[post("/api/progress/lesson-complete")]
async fn lesson_complete(
    state: web::Data<AppState>,
    request: web::Json<LessonCompletionRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    require_self_or_admin(&auth.0, &request.learner_id)?;

    let enrollment = state
        .enrollment_service
        .mark_lesson_complete(&request.learner_id, &request.course_id, &request.lesson_id)
        .await?;
    Ok(HttpResponse::Ok().json(EnrollmentProgress::from(enrollment)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(enroll)
        .service(list_enrollments)
        .service(unenroll)
        .service(drop_course)
        .service(lesson_complete);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::SessionGuard,
        config::Config,
        models::{
            domain::{course::fixtures::course, Role, User},
            dto::request::CreateCourseRequest,
        },
    };
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;

    async fn state_with_course() -> (AppState, String) {
        let state = AppState::in_memory(Config::test_config());
        let template = course("ignored", &[5]);
        let created = state
            .course_service
            .create_course(CreateCourseRequest {
                title: template.title,
                category: template.category,
                level: template.level,
                modules: template.modules,
            })
            .await
            .unwrap();
        (state, created.id)
    }

    fn bearer(state: &AppState, user: &User) -> (&'static str, String) {
        let issued = state.token_issuer.issue(user).unwrap();
        ("Authorization", format!("Bearer {}", issued.token))
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .wrap(SessionGuard::new(
                        Arc::clone(&$state.auth_service),
                        &$state.config.session_cookie_name,
                    ))
                    .app_data(web::Data::new($state.clone()))
                    .service(enroll)
                    .service(list_enrollments)
                    .service(unenroll)
                    .service(drop_course)
                    .service(lesson_complete),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn learner_progress_through_http() {
        let (state, course_id) = state_with_course().await;
        let ada = User::new("Ada", "ada@example.com", Role::Learner, "h");
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/enrollments")
            .insert_header(bearer(&state, &ada))
            .set_json(json!({ "learner_id": ada.id, "course_id": course_id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        for lesson in ["l1", "l2", "l3"] {
            let req = test::TestRequest::post()
                .uri("/api/progress/lesson-complete")
                .insert_header(bearer(&state, &ada))
                .set_json(json!({ "learner_id": ada.id, "course_id": course_id, "lesson_id": lesson }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let req = test::TestRequest::get()
            .uri("/api/enrollments")
            .insert_header(bearer(&state, &ada))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["progress"], 60);
        assert_eq!(body[0]["status"], "active");
    }

    #[actix_web::test]
    async fn learners_cannot_act_for_others() {
        let (state, course_id) = state_with_course().await;
        let ada = User::new("Ada", "ada@example.com", Role::Learner, "h");
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/enrollments")
            .insert_header(bearer(&state, &ada))
            .set_json(json!({ "learner_id": "someone-else", "course_id": course_id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn anonymous_requests_are_unauthorized() {
        let (state, course_id) = state_with_course().await;
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/enrollments")
            .set_json(json!({ "learner_id": "x", "course_id": course_id }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn completing_without_enrollment_is_forbidden() {
        let (state, course_id) = state_with_course().await;
        let ada = User::new("Ada", "ada@example.com", Role::Learner, "h");
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/progress/lesson-complete")
            .insert_header(bearer(&state, &ada))
            .set_json(json!({ "learner_id": ada.id, "course_id": course_id, "lesson_id": "l1" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "NOT_ENROLLED");
    }
}
