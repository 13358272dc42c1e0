use secrecy::SecretString;
use std::env;

pub const DEFAULT_JWT_SECRET: &str = "dev_secret_key_change_in_production";

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub jwt_secret: SecretString,
    pub token_expiration_minutes: i64,
    pub password_min_length: usize,
    pub bcrypt_cost: u32,
    pub session_cookie_name: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<SecretString>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME").unwrap_or_else(|_| "seeyc-local".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: parse_env("WEB_SERVER_PORT").unwrap_or(8080),
            jwt_secret: SecretString::from(
                env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string()),
            ),
            token_expiration_minutes: parse_env("TOKEN_EXPIRATION_MINUTES").unwrap_or(60),
            password_min_length: parse_env("PASSWORD_MIN_LENGTH").unwrap_or(6),
            bcrypt_cost: parse_env("BCRYPT_COST").unwrap_or(bcrypt::DEFAULT_COST),
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "seeyc_session".to_string()),
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|e| !e.trim().is_empty()),
            admin_password: env::var("ADMIN_PASSWORD")
                .ok()
                .filter(|p| !p.is_empty())
                .map(SecretString::from),
        }
    }

    /// Validate that production-critical configuration is set.
    /// Panics if the signing secret is the default or too short.
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        let jwt_secret = self.jwt_secret.expose_secret();

        if jwt_secret == DEFAULT_JWT_SECRET {
            panic!(
                "FATAL: JWT_SECRET is using default value! Set JWT_SECRET environment variable to a secure random string."
            );
        }

        if jwt_secret.len() < 32 {
            panic!(
                "FATAL: JWT_SECRET is too short ({}). Must be at least 32 characters for security.",
                jwt_secret.len()
            );
        }

        if self.token_expiration_minutes <= 0 {
            panic!("FATAL: TOKEN_EXPIRATION_MINUTES must be positive.");
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "seeyc-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            jwt_secret: SecretString::from("test_jwt_secret_key".to_string()),
            token_expiration_minutes: 60,
            password_min_length: 6,
            bcrypt_cost: 4,
            session_cookie_name: "seeyc_session".to_string(),
            admin_email: Some("admin@seeyc.com".to_string()),
            admin_password: Some(SecretString::from("admin-pass".to_string())),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
