use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
};

use actix_web::{
    body::EitherBody,
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, Header},
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse,
};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use futures::future::LocalBoxFuture;

use crate::{
    auth::{
        guard::Decision,
        token::{IssuedToken, TokenIssuer},
        Claims,
    },
    errors::{AppError, ErrorResponse},
    services::auth_service::AuthService,
};

/// Where the request's token came from; only cookie sessions are slid forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenSource {
    Header,
    Cookie,
}

/// Resolves the session for every request and applies the route policy.
///
/// Verified claims are stored in the request extensions for
/// [`AuthenticatedUser`]. Cookie sessions past half their lifetime are
/// re-issued from the stored principal before the policy runs, and the new
/// cookie goes on the response unless the handler set the cookie itself.
pub struct SessionGuard {
    auth: Arc<AuthService>,
    cookie_name: Rc<str>,
}

impl SessionGuard {
    pub fn new(auth: Arc<AuthService>, cookie_name: &str) -> Self {
        Self {
            auth,
            cookie_name: Rc::from(cookie_name),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionGuardService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGuardService {
            service: Rc::new(service),
            auth: Arc::clone(&self.auth),
            cookie_name: Rc::clone(&self.cookie_name),
        }))
    }
}

pub struct SessionGuardService<S> {
    service: Rc<S>,
    auth: Arc<AuthService>,
    cookie_name: Rc<str>,
}

impl<S, B> Service<ServiceRequest> for SessionGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let auth = Arc::clone(&self.auth);
        let cookie_name = Rc::clone(&self.cookie_name);

        Box::pin(async move {
            let issuer = auth.issuer();
            let token = extract_token(&req, &cookie_name);
            let mut claims = token.as_ref().and_then(|(t, _)| match issuer.verify(t) {
                Ok(claims) => Some(claims),
                Err(e) => {
                    log::debug!("Ignoring session token on {}: {}", req.path(), e);
                    None
                }
            });

            let aging = match (&token, &claims) {
                (Some((raw, TokenSource::Cookie)), Some(c)) if issuer.needs_refresh(c) => {
                    Some(raw.clone())
                }
                _ => None,
            };

            let mut slid = None;
            if let Some(raw) = aging {
                match auth.refresh(&raw).await {
                    Ok(issued) => {
                        claims = Some(issued.claims.clone());
                        slid = Some(issued);
                    }
                    Err(AppError::TokenInvalid(reason)) => {
                        log::info!("Ending session on {}: {}", req.path(), reason);
                        claims = None;
                    }
                    Err(e) => log::warn!("Session refresh skipped: {}", e),
                }
            }

            let requested = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| req.path().to_string());

            let early = match auth.policy().evaluate(&requested, claims.as_ref()) {
                Decision::Allow => None,
                Decision::Redirect(target) => {
                    log::debug!("Redirecting {} to {}", requested, target);
                    Some(
                        HttpResponse::Found()
                            .insert_header((header::LOCATION, target))
                            .finish(),
                    )
                }
                Decision::Deny => {
                    log::info!("Denied anonymous request to {}", requested);
                    let err = AppError::Forbidden("Administrator access required".to_string());
                    Some(HttpResponse::Forbidden().json(ErrorResponse {
                        error: err.to_string(),
                        code: err.error_code(),
                        status: 403,
                    }))
                }
            };

            if let Some(response) = early {
                let mut res = req.into_response(response);
                if let Some(issued) = &slid {
                    attach_slid_cookie(&mut res, &cookie_name, issued, issuer);
                }
                return Ok(res.map_into_right_body());
            }

            if let Some(claims) = claims {
                req.extensions_mut().insert(claims);
            }

            let mut res = service.call(req).await?;
            if let Some(issued) = &slid {
                attach_slid_cookie(&mut res, &cookie_name, issued, issuer);
            }

            Ok(res.map_into_left_body())
        })
    }
}

/// Leaves the response alone when it already sets or removes the session cookie.
fn attach_slid_cookie<B>(
    res: &mut ServiceResponse<B>,
    cookie_name: &str,
    issued: &IssuedToken,
    issuer: &TokenIssuer,
) {
    if res.response().cookies().any(|c| c.name() == cookie_name) {
        log::debug!("Response manages {} itself; not sliding", cookie_name);
        return;
    }

    let cookie = session_cookie(cookie_name, issued, issuer);
    if let Err(e) = res.response_mut().add_cookie(&cookie) {
        log::warn!("Could not attach refreshed session cookie: {}", e);
    }
}

fn extract_token(req: &ServiceRequest, cookie_name: &str) -> Option<(String, TokenSource)> {
    if let Ok(auth) = Authorization::<Bearer>::parse(req) {
        return Some((auth.into_scheme().token().to_string(), TokenSource::Header));
    }
    req.cookie(cookie_name)
        .map(|c| (c.value().to_string(), TokenSource::Cookie))
}

pub fn session_cookie(name: &str, issued: &IssuedToken, issuer: &TokenIssuer) -> Cookie<'static> {
    Cookie::build(name.to_string(), issued.token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(issuer.lifetime().num_seconds()))
        .finish()
}

pub fn expired_session_cookie(name: &str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name.to_string(), String::new())
        .path("/")
        .http_only(true)
        .finish();
    cookie.make_removal();
    cookie
}

/// Extractor for handlers that require a signed-in principal.
pub struct AuthenticatedUser(pub Claims);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let claims = req
            .extensions()
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()));

        ready(claims.map(AuthenticatedUser))
    }
}
