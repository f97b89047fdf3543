//! Access token issuance and validation.
//!
//! Access tokens are stateless HS256 JWTs carrying `{iss, sub, iat, exp}`.
//! Validation is a pure function of the token, the secret and the supplied time.

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim embedded in every access token.
pub const ACCESS_TOKEN_ISSUER: &str = "pursuit-access";

/// Access token lifetime: 1 hour.
pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Issuer
    pub iss: String,
    /// Subject (user UUID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The JWT token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token lifetime in seconds
    pub duration: u64,
}

/// Signing configuration. Holds the keys derived from the server secret.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret.
    pub fn new(secret: &[u8]) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidInput("signing secret is empty"));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Issue an access token for `subject`, valid from `now` until `now + ttl`.
    pub fn issue_access_token(
        &self,
        subject: Uuid,
        ttl: Duration,
        now: u64,
    ) -> Result<AccessToken, JwtError> {
        if subject.is_nil() {
            return Err(JwtError::InvalidInput("subject is the nil user id"));
        }
        let duration = ttl.as_secs();
        if duration == 0 {
            return Err(JwtError::InvalidInput("token lifetime must be positive"));
        }

        let exp = now
            .checked_add(duration)
            .ok_or(JwtError::InvalidInput("token lifetime overflows"))?;
        let claims = AccessClaims {
            iss: ACCESS_TOKEN_ISSUER.to_string(),
            sub: subject.to_string(),
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(AccessToken {
            token,
            expires_at: exp,
            duration,
        })
    }

    /// Validate an access token at time `now` and return the user it was issued to.
    ///
    /// Checks run in order: signature, issuer, expiry, subject. A token is
    /// expired only when `now > exp`.
    pub fn validate_access_token(&self, token: &str, now: u64) -> Result<Uuid, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is checked below against the caller's clock.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let claims = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })?
            .claims;

        if claims.iss != ACCESS_TOKEN_ISSUER {
            return Err(TokenError::BadIssuer);
        }

        if now > claims.exp {
            return Err(TokenError::Expired);
        }

        match Uuid::parse_str(&claims.sub) {
            Ok(id) if !id.is_nil() => Ok(id),
            _ => Err(TokenError::MalformedSubject),
        }
    }
}

/// Errors from issuing tokens.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Configuration or programming fault (empty secret, nil subject, bad ttl)
    #[error("invalid token input: {0}")]
    InvalidInput(&'static str),
    #[error("failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
}

/// Reasons an access token is rejected. Only ever logged, never sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("signature does not match")]
    BadSignature,
    #[error("token is malformed")]
    Malformed,
    #[error("unexpected issuer")]
    BadIssuer,
    #[error("token has expired")]
    Expired,
    #[error("subject is not a valid user id")]
    MalformedSubject,
}
