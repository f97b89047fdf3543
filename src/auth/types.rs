//! Authentication types.

use uuid::Uuid;

/// The user a request was authenticated as.
///
/// Only the auth layer can construct one, so holding an
/// `AuthenticatedIdentity` means a valid access token was presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    user_id: Uuid,
}

impl AuthenticatedIdentity {
    pub(super) fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}
