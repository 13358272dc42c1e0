use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};

use crate::{
    auth::claims::Claims,
    errors::{AppError, AppResult},
    models::domain::user::User,
};

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at()
    }
}

/// Signs and verifies session tokens. Holds no per-session state; the signing
/// key is loaded once and only read afterwards.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &SecretString, lifetime_minutes: i64) -> Self {
        let secret_bytes = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            validation,
            lifetime: Duration::minutes(lifetime_minutes),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, user: &User) -> AppResult<IssuedToken> {
        let claims = Claims::new(user, Utc::now(), self.lifetime);
        let token = self.sign(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    /// Re-signs an unexpired token with a fresh window. The claims, role
    /// included, are carried over unchanged.
    pub fn refresh(&self, token: &str) -> AppResult<IssuedToken> {
        let current = self.verify(token)?;
        let claims = current.extended(Utc::now(), self.lifetime);
        let token = self.sign(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(AppError::from)
    }

    /// True once less than half of the token's lifetime remains.
    pub fn needs_refresh(&self, claims: &Claims) -> bool {
        let remaining = claims.exp - Utc::now().timestamp();
        remaining < self.lifetime.num_seconds() / 2
    }

    pub(crate) fn sign(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to sign session token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, models::domain::Role};

    fn issuer() -> TokenIssuer {
        let config = Config::test_config();
        TokenIssuer::new(&config.jwt_secret, config.token_expiration_minutes)
    }

    fn learner() -> User {
        User::new("John Doe", "john@example.com", Role::Learner, "hash")
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let user = learner();
        let issued = issuer.issue(&user).unwrap();

        assert!(!issued.token.is_empty());

        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Learner);
        assert_eq!(claims.email, "john@example.com");
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let result = issuer().verify("invalid.token.here");
        assert!(matches!(result, Err(AppError::TokenInvalid(_))));
    }

    #[test]
    fn test_token_signed_with_other_key_is_invalid() {
        let other = TokenIssuer::new(&SecretString::from("another-secret".to_string()), 60);
        let issued = other.issue(&learner()).unwrap();

        let result = issuer().verify(&issued.token);
        assert!(matches!(result, Err(AppError::TokenInvalid(_))));
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        let issuer = issuer();
        let claims = Claims::new(
            &learner(),
            Utc::now() - Duration::minutes(120),
            Duration::minutes(60),
        );
        let token = issuer.sign(&claims).unwrap();

        assert_eq!(issuer.verify(&token), Err(AppError::TokenExpired));
        assert!(matches!(issuer.refresh(&token), Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_refresh_extends_expiry_and_keeps_claims() {
        let issuer = issuer();
        let claims = Claims::new(
            &learner(),
            Utc::now() - Duration::minutes(45),
            Duration::minutes(60),
        );
        let token = issuer.sign(&claims).unwrap();

        let refreshed = issuer.refresh(&token).unwrap();
        assert!(refreshed.claims.exp > claims.exp);
        assert_eq!(refreshed.claims.sub, claims.sub);
        assert_eq!(refreshed.claims.role, claims.role);
        assert_eq!(issuer.verify(&refreshed.token).unwrap(), refreshed.claims);
    }

    #[test]
    fn test_needs_refresh_after_half_lifetime() {
        let issuer = issuer();
        let fresh = Claims::new(&learner(), Utc::now(), issuer.lifetime());
        let aging = Claims::new(
            &learner(),
            Utc::now() - Duration::minutes(40),
            issuer.lifetime(),
        );

        assert!(!issuer.needs_refresh(&fresh));
        assert!(issuer.needs_refresh(&aging));
    }
}
