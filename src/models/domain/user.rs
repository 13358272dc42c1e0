use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Learner,
    Instructor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Learner => "learner",
            Role::Instructor => "instructor",
            Role::Admin => "admin",
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Instructor | Role::Admin)
    }
}

/// A registered identity. The role is the only field that changes after
/// creation, and only through the admin role-change operation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(display_name: &str, email: &str, role: Role, password_hash: &str) -> Self {
        User {
            id: Uuid::new_v4().to_string(),
            display_name: display_name.trim().to_string(),
            email: normalize_email(email),
            role,
            password_hash: password_hash.to_string(),
            created_at: Some(Utc::now()),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
impl User {
    /// Builds a user whose password hash matches `password` at the cheapest bcrypt cost.
    pub fn test_user(display_name: &str, email: &str, role: Role, password: &str) -> Self {
        let hash = bcrypt::hash(password, 4).expect("bcrypt hash should succeed");
        User::new(display_name, email, role, &hash)
    }
}
