use actix_web::{get, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{request::ChangeRoleRequest, response::PrincipalDto},
};

#[get("/api/me")]
async fn me(state: web::Data<AppState>, auth: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    let user = state.user_service.get_user(&auth.0.sub).await?;
    Ok(HttpResponse::Ok().json(PrincipalDto::from(user)))
}

#[put("/api/users/{id}/role")]
async fn change_role(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<ChangeRoleRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let user = state
        .user_service
        .change_role(&auth.0, &id, request.role)
        .await?;
    Ok(HttpResponse::Ok().json(PrincipalDto::from(user)))
}

#[get("/health")]
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[get("/health/ready")]
async fn health_check_ready(state: web::Data<AppState>) -> HttpResponse {
    let (store, healthy) = match &state.database {
        Some(db) => ("mongodb", db.health_check().await.is_ok()),
        None => ("memory", true),
    };

    let response = serde_json::json!({
        "status": if healthy { "ready" } else { "not_ready" },
        "version": env!("CARGO_PKG_VERSION"),
        "dependencies": {
            store: if healthy { "ok" } else { "error" }
        }
    });

    if healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

#[get("/health/live")]
async fn health_check_live() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(me)
        .service(change_role)
        .service(health_check)
        .service(health_check_ready)
        .service(health_check_live);
}
