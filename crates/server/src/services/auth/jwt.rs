//! Stateless HS256 bearer tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use showcase_core::{Email, UserId, UserRole};

use super::AuthError;
use crate::config::JwtConfig;
use crate::models::{CurrentUser, User};

/// Token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: UserId,
    pub email: Email,
    pub role: UserRole,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expires at (unix seconds).
    pub exp: i64,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Response body for `POST /api/auth/token`.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

/// Signs and verifies bearer tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtService {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::hours(config.ttl_hours),
        }
    }

    /// Issue a token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenSigning(e.to_string()))?;

        Ok(IssuedToken {
            access_token,
            token_type: "Bearer",
            expires_in: self.ttl.num_seconds(),
        })
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenExpired` for expired tokens and
    /// `AuthError::InvalidToken` for anything else that fails validation.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is case-insensitive; an empty token yields `None`.
#[must_use]
pub fn extract_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn service(ttl_hours: i64) -> JwtService {
        JwtService::new(&JwtConfig {
            secret: SecretString::from("k3Yq9!vLz@8mR#2pT$6wX^4nB&7cF*1d"),
            ttl_hours,
        })
    }

    fn user() -> User {
        User {
            id: UserId::new(42),
            email: Email::parse("creator@example.com").unwrap(),
            display_name: None,
            bio: None,
            avatar_url: None,
            role: UserRole::Admin,
            external_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_verifies() {
        let jwt = service(24);
        let issued = jwt.issue(&user()).unwrap();
        assert_eq!(issued.token_type, "Bearer");
        assert_eq!(issued.expires_in, 24 * 3600);

        let claims = jwt.verify(&issued.access_token).unwrap();
        assert_eq!(claims.sub, UserId::new(42));
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.email.as_str(), "creator@example.com");
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let jwt = service(-1);
        let issued = jwt.issue(&user()).unwrap();
        assert!(matches!(
            jwt.verify(&issued.access_token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn token_from_other_secret_is_invalid() {
        let other = JwtService::new(&JwtConfig {
            secret: SecretString::from("Zz8#Qq1!Ww2@Ee3$Rr4%Tt5^Yy6&Uu7*"),
            ttl_hours: 1,
        });
        let issued = other.issue(&user()).unwrap();
        assert!(matches!(
            service(1).verify(&issued.access_token),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            service(1).verify("not.a.jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("bearer   abc"), Some("abc"));
        assert_eq!(extract_bearer("Basic dXNlcjpwYXNz"), None);
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Bearer"), None);
    }
}
