//! Authentication state trait and macro.

use crate::clock::Clock;
use crate::jwt::JwtConfig;

/// Trait for state types that can authenticate requests.
pub trait HasAuthBackend {
    fn jwt(&self) -> &JwtConfig;
    fn clock(&self) -> &dyn Clock;
}

/// Macro to implement `HasAuthBackend` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `jwt: Arc<JwtConfig>`
/// - `clock: Arc<dyn Clock>`
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub jwt: Arc<JwtConfig>,
///     pub clock: Arc<dyn Clock>,
///     // ... other fields
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
            fn clock(&self) -> &dyn $crate::clock::Clock {
                self.clock.as_ref()
            }
        }
    };
}
