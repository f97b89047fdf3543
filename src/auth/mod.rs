//! Access token authentication for API routes.
//!
//! Stateless access tokens (1 hour) arrive as `Authorization: Bearer` or as
//! the `auth-token` cookie. Opaque refresh tokens (60 days) are stored in the
//! database and only accepted by the refresh, revoke and logout endpoints.

mod awareness;
mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;
mod types;

pub use awareness::{ClientMode, detect_client_mode};
pub use cookie::{
    AUTH_COOKIE_NAME, BearerError, auth_cookie, bearer_token, clear_auth_cookie, get_cookie,
};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{
    Credential, CredentialSource, authenticate, extract_credential, require_auth,
};
pub use ip::extract_client_ip;
pub use state::HasAuthBackend;
pub use types::AuthenticatedIdentity;
