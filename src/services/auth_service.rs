use std::sync::Arc;

use validator::Validate;

use crate::{
    auth::{
        credentials::hash_password, CredentialValidator, Decision, IssuedToken, RoutePolicy,
        TokenIssuer,
    },
    errors::{AppError, AppResult},
    models::{
        domain::{Role, User},
        dto::request::{LoginRequest, RegisterRequest},
    },
    repositories::UserRepository,
};

/// Ties credential checks, token issuance and the route policy together.
pub struct AuthService {
    validator: CredentialValidator,
    issuer: Arc<TokenIssuer>,
    policy: Arc<RoutePolicy>,
    users: Arc<dyn UserRepository>,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        validator: CredentialValidator,
        issuer: Arc<TokenIssuer>,
        policy: Arc<RoutePolicy>,
        users: Arc<dyn UserRepository>,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            validator,
            issuer,
            policy,
            users,
            bcrypt_cost,
        }
    }

    pub async fn login(&self, request: &LoginRequest) -> AppResult<(User, IssuedToken)> {
        let user = self.validator.validate(request).await?;
        let issued = self.issuer.issue(&user)?;
        log::info!("User {} signed in as {}", user.id, user.role.as_str());
        Ok((user, issued))
    }

    /// Self-service sign-up always yields a learner.
    pub async fn register(&self, request: RegisterRequest) -> AppResult<(User, IssuedToken)> {
        request.validate()?;
        self.validator
            .check_format(&request.email, &request.password)?;

        let hash = hash_password(&request.password, self.bcrypt_cost).await?;
        let user = User::new(&request.display_name, &request.email, Role::Learner, &hash);
        let user = self.users.create(user).await?;
        let issued = self.issuer.issue(&user)?;

        log::info!("Registered learner {}", user.id);
        Ok((user, issued))
    }

    /// Re-issues an unexpired token. The principal is reloaded so a role
    /// changed since the last issue takes effect here.
    pub async fn refresh(&self, token: &str) -> AppResult<IssuedToken> {
        let claims = self.issuer.verify(token)?;

        match self.users.find_by_id(&claims.sub).await? {
            Some(user) => {
                if user.role != claims.role {
                    log::info!(
                        "Role of {} changed from {} to {} on refresh",
                        user.id,
                        claims.role.as_str(),
                        user.role.as_str()
                    );
                }
                self.issuer.issue(&user)
            }
            None => Err(AppError::TokenInvalid(
                "Principal no longer exists".to_string(),
            )),
        }
    }

    pub fn authorize(&self, path: &str, token: Option<&str>) -> Decision {
        self.policy.authorize(&self.issuer, path, token)
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }
}
