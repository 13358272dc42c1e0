use actix_web::{get, post, web, HttpMessage, HttpRequest, HttpResponse};
use async_graphql::http::GraphiQLSource;
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};

use crate::{auth::Claims, graphql::Schema};

/// Executes a GraphQL request; the session resolved by the guard is handed to resolvers.
#[post("/graphql")]
async fn graphql(schema: web::Data<Schema>, req: HttpRequest, gql: GraphQLRequest) -> GraphQLResponse {
    let mut request = gql.into_inner();
    if let Some(claims) = req.extensions().get::<Claims>().cloned() {
        request = request.data(claims);
    }
    schema.execute(request).await.into()
}

#[get("/graphiql")]
async fn graphiql() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(GraphiQLSource::build().endpoint("/graphql").finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(graphql).service(graphiql);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app_state::AppState,
        auth::SessionGuard,
        config::Config,
        graphql::create_schema,
        models::domain::{Role, User},
    };
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .wrap(SessionGuard::new(
                        Arc::clone(&$state.auth_service),
                        &$state.config.session_cookie_name,
                    ))
                    .app_data(web::Data::new(create_schema($state.clone())))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn me_resolves_the_bearer_principal() {
        let state = AppState::in_memory(Config::test_config());
        let admin = state.seed_admin().await.unwrap().unwrap();
        let issued = state.token_issuer.issue(&admin).unwrap();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/graphql")
            .insert_header(("Authorization", format!("Bearer {}", issued.token)))
            .set_json(json!({ "query": "{ me { email role } }" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["data"]["me"]["email"], "admin@seeyc.com");
        assert_eq!(body["data"]["me"]["role"], "ADMIN");
    }

    #[actix_web::test]
    async fn anonymous_query_gets_unauthorized_code() {
        let state = AppState::in_memory(Config::test_config());
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/graphql")
            .set_json(json!({ "query": "{ me { email } }" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["errors"][0]["extensions"]["code"], "UNAUTHORIZED");
    }

    #[actix_web::test]
    async fn learner_cannot_read_someone_elses_enrollments() {
        let state = AppState::in_memory(Config::test_config());
        let ada = User::new("Ada", "ada@example.com", Role::Learner, "h");
        let issued = state.token_issuer.issue(&ada).unwrap();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/graphql")
            .insert_header(("Authorization", format!("Bearer {}", issued.token)))
            .set_json(json!({ "query": r#"{ enrollments(learnerId: "someone-else") { progress } }"# }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["errors"][0]["extensions"]["code"], "FORBIDDEN");
    }

    #[actix_web::test]
    async fn graphiql_page_is_served() {
        let state = AppState::in_memory(Config::test_config());
        let app = app!(state);

        let req = test::TestRequest::get().uri("/graphiql").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
