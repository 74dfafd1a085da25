/// Signed access and refresh tokens
///
/// Access and refresh tokens are HS256 JWTs signed with two different secrets,
/// shared across roles. Both carry the account id and role tag.
use crate::account::Role;
use crate::config::AuthConfig;
use crate::error::AuthError;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access tokens live 15 minutes
pub const ACCESS_TOKEN_LIFETIME_SECS: i64 = 15 * 60;
/// Refresh tokens live 7 days
pub const REFRESH_TOKEN_LIFETIME_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub id: String,
    /// Role tag, resolved against the known roles by the caller
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    /// Makes tokens minted in the same second distinct
    pub jti: String,
}

impl Claims {
    pub fn role(&self) -> Result<Role, AuthError> {
        self.role.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct Signer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl Signer {
    fn new(secret: &str, lifetime: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    fn sign(&self, id: &str, role: Role) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            id: id.to_string(),
            role: role.as_str().to_string(),
            exp: (now + self.lifetime).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!("Failed to sign token: {}", e);
            AuthError::InvalidToken
        })
    }

    fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => {
                    tracing::debug!("Token verification failed: {}", e);
                    AuthError::InvalidToken
                }
            })
    }
}

/// Issues and verifies token pairs
pub struct TokenService {
    access: Signer,
    refresh: Signer,
}

impl TokenService {
    pub fn new(access_secret: &str, refresh_secret: &str) -> Self {
        Self::with_lifetimes(
            access_secret,
            refresh_secret,
            Duration::seconds(ACCESS_TOKEN_LIFETIME_SECS),
            Duration::seconds(REFRESH_TOKEN_LIFETIME_SECS),
        )
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.access_token_secret, &config.refresh_token_secret)
    }

    /// Custom lifetimes. Negative values mint already-expired tokens.
    pub fn with_lifetimes(
        access_secret: &str,
        refresh_secret: &str,
        access_lifetime: Duration,
        refresh_lifetime: Duration,
    ) -> Self {
        Self {
            access: Signer::new(access_secret, access_lifetime),
            refresh: Signer::new(refresh_secret, refresh_lifetime),
        }
    }

    pub fn issue_token_pair(&self, id: &str, role: Role) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.access.sign(id, role)?,
            refresh_token: self.refresh.sign(id, role)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        self.access.verify(token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AuthError> {
        self.refresh.verify(token)
    }

    /// Read claims without checking signature or expiry.
    ///
    /// Only for logout, where the token is being discarded anyway.
    pub fn decode_unverified(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS: &str = "access-secret-for-tests-only-0123456789";
    const REFRESH: &str = "refresh-secret-for-tests-only-0123456789";

    #[test]
    fn test_issue_and_verify_pair() {
        let tokens = TokenService::new(ACCESS, REFRESH);
        let pair = tokens.issue_token_pair("abc", Role::Admin).unwrap();

        let access = tokens.verify_access(&pair.access_token).unwrap();
        let refresh = tokens.verify_refresh(&pair.refresh_token).unwrap();

        assert_eq!(access.id, "abc");
        assert_eq!(access.role().unwrap(), Role::Admin);
        assert_eq!(refresh.id, "abc");
        assert_eq!(refresh.role().unwrap(), Role::Admin);
        assert!(refresh.exp - access.exp >= REFRESH_TOKEN_LIFETIME_SECS - ACCESS_TOKEN_LIFETIME_SECS - 1);
    }

    #[test]
    fn test_tokens_are_distinct() {
        let tokens = TokenService::new(ACCESS, REFRESH);
        let a = tokens.issue_token_pair("abc", Role::User).unwrap();
        let b = tokens.issue_token_pair("abc", Role::User).unwrap();
        assert_ne!(a.refresh_token, b.refresh_token);
    }

    #[test]
    fn test_expired_is_distinct_from_invalid() {
        let tokens = TokenService::with_lifetimes(
            ACCESS,
            REFRESH,
            Duration::seconds(-30),
            Duration::seconds(-30),
        );
        let pair = tokens.issue_token_pair("abc", Role::User).unwrap();

        assert_eq!(tokens.verify_access(&pair.access_token), Err(AuthError::ExpiredToken));
        assert_eq!(tokens.verify_refresh(&pair.refresh_token), Err(AuthError::ExpiredToken));
        assert_eq!(tokens.verify_access("not.a.token"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_secrets_are_not_interchangeable() {
        let tokens = TokenService::new(ACCESS, REFRESH);
        let pair = tokens.issue_token_pair("abc", Role::User).unwrap();

        assert_eq!(tokens.verify_refresh(&pair.access_token), Err(AuthError::InvalidToken));
        assert_eq!(tokens.verify_access(&pair.refresh_token), Err(AuthError::InvalidToken));

        let other = TokenService::new(
            "another-access-secret-0123456789abcdef",
            "another-refresh-secret-0123456789abcdef",
        );
        assert_eq!(other.verify_access(&pair.access_token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_tampered_expired_token_is_invalid() {
        let expired = TokenService::with_lifetimes(
            ACCESS,
            REFRESH,
            Duration::seconds(-30),
            Duration::seconds(-30),
        );
        let pair = expired.issue_token_pair("abc", Role::User).unwrap();
        let forged = TokenService::new("forged-secret-0123456789abcdefghij", REFRESH);
        assert_eq!(forged.verify_access(&pair.access_token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_decode_unverified_ignores_expiry_and_signature() {
        let expired = TokenService::with_lifetimes(
            ACCESS,
            REFRESH,
            Duration::seconds(-30),
            Duration::seconds(-30),
        );
        let pair = expired.issue_token_pair("abc", Role::Admin).unwrap();

        let reader = TokenService::new("unrelated-secret-0123456789abcdefgh", REFRESH);
        let claims = reader.decode_unverified(&pair.refresh_token).unwrap();
        assert_eq!(claims.id, "abc");
        assert_eq!(claims.role, "ADMIN");

        assert!(reader.decode_unverified("garbage").is_none());
    }

    #[test]
    fn test_unknown_role_tag() {
        let claims = Claims {
            id: "abc".to_string(),
            role: "ROOT".to_string(),
            exp: 0,
            iat: 0,
            jti: "x".to_string(),
        };
        assert_eq!(claims.role(), Err(AuthError::UnknownRole("ROOT".to_string())));
    }
}
