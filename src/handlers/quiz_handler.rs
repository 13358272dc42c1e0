use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use crate::{
    app_state::AppState,
    auth::{require_self_or_admin, require_staff, AuthenticatedUser},
    errors::AppError,
    models::dto::{
        request::{CreateQuizRequest, SubmitQuizAttemptInput},
        response::{QuizAttemptSummary, QuizForTaking},
    },
};

#[derive(Debug, Deserialize)]
pub struct AttemptsQuery {
    pub learner_id: Option<String>,
}

#[post("/api/quizzes")]
async fn create_quiz(
    state: web::Data<AppState>,
    request: web::Json<CreateQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_staff(&auth.0)?;

    let quiz = state
        .quiz_service
        .create_quiz(request.into_inner(), &auth.0.sub)
        .await?;
    Ok(HttpResponse::Created().json(quiz))
}

/// Staff see the answer key; learners get the quiz as it is taken.
#[get("/api/quizzes/{id}")]
async fn get_quiz(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state.quiz_service.get_quiz(&id).await?;

    if auth.0.role.is_staff() {
        Ok(HttpResponse::Ok().json(quiz))
    } else {
        Ok(HttpResponse::Ok().json(QuizForTaking::from(quiz)))
    }
}

#[get("/api/quizzes/{id}/attempts")]
async fn list_attempts(
    state: web::Data<AppState>,
    id: web::Path<String>,
    query: web::Query<AttemptsQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let learner_id = query.learner_id.as_deref().unwrap_or(&auth.0.sub);
    require_self_or_admin(&auth.0, learner_id)?;

    let attempts: Vec<QuizAttemptSummary> = state
        .quiz_attempt_service
        .list_attempts(learner_id, &id)
        .await?
        .into_iter()
        .map(QuizAttemptSummary::from)
        .collect();
    Ok(HttpResponse::Ok().json(attempts))
}

#[post("/api/quiz-attempts")]
async fn submit_quiz_attempt(
    state: web::Data<AppState>,
    request: web::Json<SubmitQuizAttemptInput>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_self_or_admin(&auth.0, &request.learner_id)?;

    let response = state
        .quiz_attempt_service
        .submit(request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(response))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_quiz)
        .service(get_quiz)
        .service(list_attempts)
        .service(submit_quiz_attempt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::SessionGuard,
        config::Config,
        models::domain::{Role, User},
    };
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn quiz_body() -> Value {
        json!({
            "title": "Borrowing",
            "passing_score": 50,
            "max_attempts": 1,
            "questions": [
                {
                    "id": "q1",
                    "prompt": "Pick the shared reference",
                    "question_type": "multiple-choice",
                    "options": ["&T", "&mut T"],
                    "correct_answers": ["&T"],
                    "points": 1
                }
            ]
        })
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
                    .service(create_quiz)
                    .service(get_quiz)
                    .service(list_attempts)
                    .service(submit_quiz_attempt),
            )
            .await
        };
    }

    fn bearer(state: &AppState, user: &User) -> (&'static str, String) {
        let issued = state.token_issuer.issue(user).unwrap();
        ("Authorization", format!("Bearer {}", issued.token))
    }

    #[actix_web::test]
    async fn submit_then_hit_the_limit() {
        let state = AppState::in_memory(Config::test_config());
        let instructor = User::new("Ins", "ins@example.com", Role::Instructor, "h");
        let ada = User::new("Ada", "ada@example.com", Role::Learner, "h");
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/quizzes")
            .insert_header(bearer(&state, &instructor))
            .set_json(quiz_body())
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let quiz_id = created["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/api/quizzes/{}", quiz_id))
            .insert_header(bearer(&state, &ada))
            .to_request();
        let for_taking: Value = test::call_and_read_body_json(&app, req).await;
        assert!(for_taking["questions"][0].get("correct_answers").is_none());

        let submission = json!({
            "learner_id": ada.id,
            "quiz_id": quiz_id,
            "answers": [{ "question_id": "q1", "values": ["&T"] }]
        });

        let req = test::TestRequest::post()
            .uri("/api/quiz-attempts")
            .insert_header(bearer(&state, &ada))
            .set_json(&submission)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["score"], 100.0);
        assert_eq!(body["passed"], true);
        assert_eq!(body["attempt_ordinal"], 1);

        let req = test::TestRequest::post()
            .uri("/api/quiz-attempts")
            .insert_header(bearer(&state, &ada))
            .set_json(&submission)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "ATTEMPT_LIMIT_EXCEEDED");

        let req = test::TestRequest::get()
            .uri(&format!("/api/quizzes/{}/attempts", quiz_id))
            .insert_header(bearer(&state, &ada))
            .to_request();
        let attempts: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(attempts.as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn learners_cannot_author_quizzes() {
        let state = AppState::in_memory(Config::test_config());
        let ada = User::new("Ada", "ada@example.com", Role::Learner, "h");
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/quizzes")
            .insert_header(bearer(&state, &ada))
            .set_json(quiz_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
