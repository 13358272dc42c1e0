use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{require_staff, AuthenticatedUser},
    errors::AppError,
    models::dto::request::{AddLessonRequest, CreateCourseRequest},
};

#[post("/api/courses")]
async fn create_course(
    state: web::Data<AppState>,
    request: web::Json<CreateCourseRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_staff(&auth.0)?;

    let course = state
        .course_service
        .create_course(request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(course))
}

#[get("/api/courses/{id}")]
async fn get_course(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let course = state.course_service.get_course(&id).await?;
    Ok(HttpResponse::Ok().json(course))
}

#[post("/api/courses/{id}/modules/{order}/lessons")]
async fn add_lesson(
    state: web::Data<AppState>,
    path: web::Path<(String, u32)>,
    request: web::Json<AddLessonRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_staff(&auth.0)?;

    let (course_id, module_order) = path.into_inner();
    let course = state
        .course_service
        .add_lesson(&course_id, module_order, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(course))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_course)
        .service(get_course)
        .service(add_lesson);
}
