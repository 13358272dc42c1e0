pub mod claims;
pub mod credentials;
pub mod guard;
pub mod middleware;
pub mod token;
pub mod utils;

pub use claims::Claims;
pub use credentials::{CredentialValidator, IdentityStore};
pub use guard::{Decision, RoutePolicy};
pub use middleware::{AuthenticatedUser, SessionGuard};
pub use token::{IssuedToken, TokenIssuer};
pub use utils::{extract_claims_from_context, require_admin, require_self_or_admin, require_staff};
