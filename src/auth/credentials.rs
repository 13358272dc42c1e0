use std::sync::Arc;

use async_trait::async_trait;
use validator::ValidateEmail;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::user::{normalize_email, User},
        dto::request::LoginRequest,
    },
};

const TIMING_EQUALIZER: &str = "seeyc-timing-equalizer";

/// Where principals and their password hashes live.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
}

pub struct CredentialValidator {
    store: Arc<dyn IdentityStore>,
    min_password_length: usize,
    /// Verified against when the email is unknown, so a miss costs as much as a wrong password.
    dummy_hash: String,
}

impl CredentialValidator {
    /// `bcrypt_cost` must match the cost stored hashes are made with.
    pub fn new(store: Arc<dyn IdentityStore>, min_password_length: usize, bcrypt_cost: u32) -> Self {
        let dummy_hash = bcrypt::hash(TIMING_EQUALIZER, bcrypt_cost).unwrap_or_else(|e| {
            log::warn!(
                "bcrypt cost {} rejected for the dummy hash ({}), using the default",
                bcrypt_cost,
                e
            );
            bcrypt::hash(TIMING_EQUALIZER, bcrypt::DEFAULT_COST).unwrap_or_default()
        });

        Self {
            store,
            min_password_length,
            dummy_hash,
        }
    }

    pub fn check_format(&self, email: &str, password: &str) -> AppResult<()> {
        if !email.validate_email() {
            return Err(AppError::InvalidFormat(
                "email is not a valid address".to_string(),
            ));
        }
        if password.chars().count() < self.min_password_length {
            return Err(AppError::InvalidFormat(format!(
                "password must be at least {} characters",
                self.min_password_length
            )));
        }
        Ok(())
    }

    /// Returns the stored principal when the credentials match. Read-only.
    pub async fn validate(&self, request: &LoginRequest) -> AppResult<User> {
        let email = normalize_email(&request.email);
        self.check_format(&email, &request.password)?;

        if request.second_factor.is_some() {
            log::debug!("Ignoring second factor supplied for {}", email);
        }

        let user = self.store.find_by_email(&email).await?;
        let hash = user
            .as_ref()
            .map(|u| u.password_hash.clone())
            .unwrap_or_else(|| self.dummy_hash.clone());

        let matches = verify_password(&request.password, hash).await?;

        match user {
            Some(user) if matches => Ok(user),
            _ => {
                log::info!("Rejected login for {}", email);
                Err(AppError::AuthFailed)
            }
        }
    }
}

/// Constant-time bcrypt comparison, run off the async executor.
pub async fn verify_password(password: &str, hash: String) -> AppResult<bool> {
    let password = password.to_string();
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::InternalError(format!("Password check aborted: {}", e)))?;

    // A malformed stored hash can never match.
    Ok(outcome.unwrap_or(false))
}

pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_string();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::InternalError(format!("Password hashing aborted: {}", e)))??;
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::Role;
    use mockall::predicate::eq;

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            second_factor: None,
        }
    }

    fn validator_with(store: MockIdentityStore) -> CredentialValidator {
        CredentialValidator::new(Arc::new(store), 6, 4)
    }

    #[tokio::test]
    async fn rejects_malformed_email_without_lookup() {
        let mut store = MockIdentityStore::new();
        store.expect_find_by_email().never();

        let result = validator_with(store)
            .validate(&login("not-an-email", "long-enough"))
            .await;
        assert!(matches!(result, Err(AppError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn rejects_short_password_without_lookup() {
        let mut store = MockIdentityStore::new();
        store.expect_find_by_email().never();

        let result = validator_with(store)
            .validate(&login("ada@example.com", "12345"))
            .await;
        assert!(matches!(result, Err(AppError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn returns_principal_for_matching_password() {
        let user = User::test_user("Ada", "ada@example.com", Role::Learner, "correct-horse");
        let expected = user.clone();

        let mut store = MockIdentityStore::new();
        store
            .expect_find_by_email()
            .with(eq("ada@example.com"))
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));

        let principal = validator_with(store)
            .validate(&login("  ADA@example.com ", "correct-horse"))
            .await
            .unwrap();
        assert_eq!(principal, expected);
    }

    #[tokio::test]
    async fn wrong_password_is_auth_failed() {
        let user = User::test_user("Ada", "ada@example.com", Role::Learner, "correct-horse");

        let mut store = MockIdentityStore::new();
        store
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let result = validator_with(store)
            .validate(&login("ada@example.com", "battery-staple"))
            .await;
        assert_eq!(result, Err(AppError::AuthFailed));
    }

    #[tokio::test]
    async fn unknown_email_is_auth_failed() {
        let mut store = MockIdentityStore::new();
        store.expect_find_by_email().returning(|_| Ok(None));

        let result = validator_with(store)
            .validate(&login("ghost@example.com", "whatever-pass"))
            .await;
        assert_eq!(result, Err(AppError::AuthFailed));
    }

    #[tokio::test]
    async fn store_errors_propagate() {
        let mut store = MockIdentityStore::new();
        store
            .expect_find_by_email()
            .returning(|_| Err(AppError::DatabaseError("down".to_string())));

        let result = validator_with(store)
            .validate(&login("ada@example.com", "whatever-pass"))
            .await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
    }

    #[test]
    fn dummy_hash_uses_configured_cost() {
        let validator = validator_with(MockIdentityStore::new());
        assert!(validator.dummy_hash.starts_with("$2b$04$"));
    }

    #[tokio::test]
    async fn hash_then_verify_round_trip() {
        let hash = hash_password("s3cret-pass", 4).await.unwrap();
        assert!(verify_password("s3cret-pass", hash.clone()).await.unwrap());
        assert!(!verify_password("other-pass", hash).await.unwrap());
    }
}
