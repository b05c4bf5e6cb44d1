use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Role;

/// Claims
///
/// The payload carried inside every bearer token. The token is the only source of
/// truth for identity and role once issued: verification never consults the
/// credential store, so a role change is only visible after the holder's current
/// token expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user identity.
    pub sub: String,
    pub role: Role,
    /// Issued At (iat), seconds since the Unix epoch.
    pub iat: usize,
    /// Expiration Time (exp), seconds since the Unix epoch. Valid while `now < exp`.
    pub exp: usize,
}

/// TokenError
///
/// Why a token could not be issued or was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token signature does not verify")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// TokenService
///
/// Issues and verifies HS256 tokens. The signing secret and TTL are fixed at
/// construction; the service holds no other state and is shared behind an `Arc`.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `verify` with zero leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// issue
    ///
    /// Signs a token for `identity` with the given role, expiring one TTL from now.
    pub fn issue(&self, identity: &str, role: Role) -> Result<String, TokenError> {
        self.issue_at(identity, role, now_secs())
    }

    /// issue_at
    ///
    /// Same as [`issue`](Self::issue) with an explicit issue time in Unix seconds.
    /// An `issued_at` older than one TTL yields a token that is already expired.
    pub fn issue_at(&self, identity: &str, role: Role, issued_at: u64) -> Result<String, TokenError> {
        let claims = Claims {
            sub: identity.to_string(),
            role,
            iat: issued_at as usize,
            exp: issued_at.saturating_add(self.ttl.as_secs()) as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// verify
    ///
    /// Checks the signature, then the expiry, and returns the claims exactly as
    /// issued. An expired token with a bad signature reports `InvalidSignature`.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        if now_secs() >= data.claims.exp as u64 {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

fn now_secs() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-12345";

    fn service() -> TokenService {
        TokenService::new(SECRET, Duration::from_secs(3600))
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let tokens = service();

        for (identity, role) in [("u1", Role::User), ("a1", Role::Admin)] {
            let token = tokens.issue(identity, role).unwrap();
            let claims = tokens.verify(&token).unwrap();
            assert_eq!(claims.sub, identity);
            assert_eq!(claims.role, role);
            assert_eq!(claims.exp - claims.iat, 3600);
        }
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service();
        let long_ago = now_secs() - 7200;

        let token = tokens.issue_at("u1", Role::User, long_ago).unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let tokens = service();
        // exp == now must already be rejected.
        let token = tokens.issue_at("u1", Role::User, now_secs() - 3600).unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_zero_ttl_token_is_never_valid() {
        let tokens = TokenService::new(SECRET, Duration::ZERO);
        let token = tokens.issue("u1", Role::User).unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_different_secret_rejected() {
        let issuer = service();
        let verifier = TokenService::new(b"another-secret", Duration::from_secs(3600));

        let token = issuer.issue("u1", Role::Admin).unwrap();
        assert_eq!(verifier.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let tokens = service();
        let user_token = tokens.issue("u1", Role::User).unwrap();
        let admin_token = tokens.issue("u1", Role::Admin).unwrap();

        // Splice the admin payload onto the user signature.
        let user_parts: Vec<&str> = user_token.split('.').collect();
        let admin_parts: Vec<&str> = admin_token.split('.').collect();
        let forged = format!("{}.{}.{}", user_parts[0], admin_parts[1], user_parts[2]);

        assert_eq!(tokens.verify(&forged), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_garbage_is_malformed_or_invalid() {
        let tokens = service();

        for garbage in ["", "abc", "invalid.token.here", "a.b", "Bearer x"] {
            let result = tokens.verify(garbage);
            assert!(
                matches!(
                    result,
                    Err(TokenError::Malformed) | Err(TokenError::InvalidSignature)
                ),
                "{garbage:?} produced {result:?}"
            );
        }
    }

    #[test]
    fn test_unknown_role_is_malformed() {
        #[derive(Serialize)]
        struct LooseClaims<'a> {
            sub: &'a str,
            role: &'a str,
            iat: u64,
            exp: u64,
        }

        let now = now_secs();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &LooseClaims {
                sub: "u1",
                role: "superuser",
                iat: now,
                exp: now + 600,
            },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(service().verify(&token), Err(TokenError::Malformed));
    }
}
