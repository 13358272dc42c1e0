//! Route-level authorization.
//!
//! [`RoutePolicy::evaluate`] is a pure function of the request path and the
//! verified claims; an absent, expired or forged token is simply the
//! anonymous case.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::auth::{claims::Claims, token::TokenIssuer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "target", rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Redirect(String),
    Deny,
}

#[derive(Debug, Clone)]
pub struct RoutePolicy {
    pub admin_prefix: String,
    pub authenticated_prefix: String,
    pub login_path: String,
    pub auth_pages: Vec<String>,
    pub return_param: String,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            admin_prefix: "/admin".to_string(),
            authenticated_prefix: "/dashboard".to_string(),
            login_path: "/login".to_string(),
            auth_pages: vec!["/login".to_string(), "/register".to_string()],
            return_param: "redirect".to_string(),
        }
    }
}

impl RoutePolicy {
    /// First matching rule wins:
    /// 1. admin area: admins only; other signed-in users go to the dashboard, anonymous is denied
    /// 2. dashboard: admins go to the admin area, anonymous goes to login with a return path
    /// 3. login/registration pages bounce signed-in users to their home area
    /// 4. everything else is public
    pub fn evaluate(&self, request_path: &str, claims: Option<&Claims>) -> Decision {
        let path = strip_query(request_path);

        if under_prefix(path, &self.admin_prefix) {
            return match claims {
                Some(c) if c.is_admin() => Decision::Allow,
                Some(_) => Decision::Redirect(self.authenticated_prefix.clone()),
                None => Decision::Deny,
            };
        }

        if under_prefix(path, &self.authenticated_prefix) {
            return match claims {
                Some(c) if c.is_admin() => Decision::Redirect(self.admin_prefix.clone()),
                Some(_) => Decision::Allow,
                None => Decision::Redirect(self.login_redirect(request_path)),
            };
        }

        if self.auth_pages.iter().any(|page| under_prefix(path, page)) {
            if let Some(c) = claims {
                return Decision::Redirect(self.home_for(c).to_string());
            }
        }

        Decision::Allow
    }

    /// Verifies the token (if any) and evaluates the path. Never fails.
    pub fn authorize(&self, issuer: &TokenIssuer, path: &str, token: Option<&str>) -> Decision {
        let claims = token.and_then(|t| match issuer.verify(t) {
            Ok(claims) => Some(claims),
            Err(e) => {
                log::debug!("Treating request to {} as anonymous: {}", path, e);
                None
            }
        });
        self.evaluate(path, claims.as_ref())
    }

    pub fn home_for(&self, claims: &Claims) -> &str {
        if claims.is_admin() {
            &self.admin_prefix
        } else {
            &self.authenticated_prefix
        }
    }

    fn login_redirect(&self, requested: &str) -> String {
        format!(
            "{}?{}={}",
            self.login_path,
            self.return_param,
            utf8_percent_encode(requested, NON_ALPHANUMERIC)
        )
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

/// `/admin` and `/admin/...` are under `/admin`; `/administrator` is not.
fn under_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
