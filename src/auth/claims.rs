use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::user::{Role, User};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // principal id
    pub name: String,
    pub email: String,
    pub role: Role, // fixed at issue time
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user: &User, issued_at: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            sub: user.id.clone(),
            name: user.display_name.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + lifetime).timestamp(),
        }
    }

    /// Same identity and role, new validity window starting at `now`.
    pub fn extended(&self, now: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            ..self.clone()
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
