use actix_web::{http::header::Header, post, web, HttpRequest, HttpResponse};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};

use crate::{
    app_state::AppState,
    auth::middleware::{expired_session_cookie, session_cookie},
    errors::AppError,
    models::dto::{
        request::{AuthorizeRequest, LoginRequest, RefreshRequest, RegisterRequest},
        response::{LoginResponse, MessageResponse, TokenResponse},
    },
};

/// Bearer header first, then the session cookie.
fn request_token(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    if let Ok(auth) = Authorization::<Bearer>::parse(req) {
        return Some(auth.into_scheme().token().to_string());
    }
    req.cookie(cookie_name).map(|c| c.value().to_string())
}

#[post("/api/auth/login")]
async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let (user, issued) = state.auth_service.login(&request).await?;
    let cookie = session_cookie(&state.config.session_cookie_name, &issued, &state.token_issuer);

    Ok(HttpResponse::Ok().cookie(cookie).json(LoginResponse {
        expires_at: issued.expires_at(),
        token: issued.token,
        principal: user.into(),
    }))
}

#[post("/api/auth/register")]
async fn register(
    state: web::Data<AppState>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let (user, issued) = state.auth_service.register(request.into_inner()).await?;
    let cookie = session_cookie(&state.config.session_cookie_name, &issued, &state.token_issuer);

    Ok(HttpResponse::Created().cookie(cookie).json(LoginResponse {
        expires_at: issued.expires_at(),
        token: issued.token,
        principal: user.into(),
    }))
}

#[post("/api/auth/refresh")]
async fn refresh(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
) -> Result<HttpResponse, AppError> {
    let token = body
        .and_then(|b| b.into_inner().token)
        .or_else(|| request_token(&req, &state.config.session_cookie_name))
        .ok_or_else(|| AppError::Unauthorized("No session token supplied".to_string()))?;

    let issued = state.auth_service.refresh(&token).await?;
    let cookie = session_cookie(&state.config.session_cookie_name, &issued, &state.token_issuer);

    Ok(HttpResponse::Ok().cookie(cookie).json(TokenResponse {
        expires_at: issued.expires_at(),
        token: issued.token,
    }))
}

/// Sessions are stateless; logging out clears the cookie and nothing else.
#[post("/api/auth/logout")]
async fn logout(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(expired_session_cookie(&state.config.session_cookie_name))
        .json(MessageResponse::new("Signed out"))
}

#[post("/api/auth/authorize")]
async fn authorize(
    state: web::Data<AppState>,
    request: web::Json<AuthorizeRequest>,
) -> HttpResponse {
    let decision = state
        .auth_service
        .authorize(&request.path, request.token.as_deref());
    HttpResponse::Ok().json(decision)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(login)
        .service(register)
        .service(refresh)
        .service(logout)
        .service(authorize);
}
