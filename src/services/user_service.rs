use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::{
    auth::{credentials::hash_password, require_admin, Claims, IdentityStore},
    errors::{AppError, AppResult},
    models::domain::{Role, User},
    repositories::UserRepository,
};

pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_user(&self, id: &str) -> AppResult<User> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", id)))
    }

    /// The only way a role changes. Tokens already issued keep their role
    /// until they are refreshed or re-issued.
    pub async fn change_role(&self, actor: &Claims, user_id: &str, role: Role) -> AppResult<User> {
        require_admin(actor)?;

        let user = self.repository.update_role(user_id, role).await?;
        log::info!(
            "Admin {} set role of {} to {}",
            actor.sub,
            user.id,
            role.as_str()
        );
        Ok(user)
    }

    /// Makes sure the configured administrator exists and holds the admin role.
    pub async fn ensure_admin(
        &self,
        email: &str,
        password: &SecretString,
        bcrypt_cost: u32,
    ) -> AppResult<User> {
        if let Some(existing) = self.repository.find_by_email(email).await? {
            if existing.role == Role::Admin {
                return Ok(existing);
            }
            log::warn!("Promoting configured admin account {}", existing.id);
            return self.repository.update_role(&existing.id, Role::Admin).await;
        }

        let hash = hash_password(password.expose_secret(), bcrypt_cost).await?;
        let admin = self
            .repository
            .create(User::new("Administrator", email, Role::Admin, &hash))
            .await?;
        log::info!("Seeded admin account {}", admin.email);
        Ok(admin)
    }
}
