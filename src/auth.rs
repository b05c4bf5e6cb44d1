use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{
    errors::ApiError,
    models::Role,
    token::{Claims, TokenError, TokenService},
};

/// Scheme keyword expected in the `Authorization` header. Case-sensitive.
const BEARER_PREFIX: &str = "Bearer ";

/// AuthUser
///
/// The authenticated request context: the identity and role decoded from a
/// verified bearer token. Created by [`authenticate`], stored in the request
/// extensions, and read back by [`require_admin`] and the handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// The token subject (the user's id as issued).
    pub id: String,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Lets handlers take `AuthUser` as an argument. It only reads the context that
/// [`authenticate`] attached; it never looks at the token itself. A route that
/// forgot the authentication layer therefore answers 401 instead of running
/// unauthenticated.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::MissingCredentials)
    }
}

/// bearer_token
///
/// Pulls the token out of `Authorization: Bearer <token>`.
///
/// * header absent: `MissingCredentials` ("Access Denied")
/// * header not text, wrong scheme, or empty token: `InvalidToken` ("Invalid Token")
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::MissingCredentials)?;

    value
        .to_str()
        .ok()
        .and_then(|raw| raw.strip_prefix(BEARER_PREFIX))
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::InvalidToken(TokenError::Malformed))
}

/// authenticate_headers
///
/// The whole Authentication Gate decision for a set of request headers.
pub fn authenticate_headers(headers: &HeaderMap, tokens: &TokenService) -> Result<AuthUser, ApiError> {
    let token = bearer_token(headers)?;
    let claims = tokens.verify(token).map_err(ApiError::InvalidToken)?;
    Ok(claims.into())
}

/// authenticate
///
/// Middleware guarding every protected route. On success the decoded identity is
/// attached to the request and the next stage runs; on failure the pipeline stops
/// here with a 401.
pub async fn authenticate(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match authenticate_headers(request.headers(), &tokens) {
        Ok(user) => user,
        Err(err) => {
            tracing::debug!(reason = ?err, uri = %request.uri(), "authentication rejected");
            return Err(err);
        }
    };

    tracing::debug!(user_id = %user.id, role = %user.role, "request authenticated");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// authorize
///
/// The Authorization Gate predicate: the attached role must equal the required one.
pub fn authorize(user: &AuthUser, required: Role) -> Result<(), ApiError> {
    if user.role == required {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// require_admin
///
/// Middleware restricting a route to `admin`. Must be layered inside
/// [`authenticate`]; the `AuthUser` argument reads the context it attached.
pub async fn require_admin(user: AuthUser, request: Request, next: Next) -> Result<Response, ApiError> {
    if let Err(err) = authorize(&user, Role::Admin) {
        tracing::warn!(user_id = %user.id, role = %user.role, uri = %request.uri(), "admin-only route refused");
        return Err(err);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::time::Duration;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");

        assert!(matches!(bearer_token(&HeaderMap::new()), Err(ApiError::MissingCredentials)));

        for bad in ["bearer abc", "Bearer", "Bearer ", "Token abc", "abc"] {
            assert!(
                matches!(bearer_token(&headers_with(bad)), Err(ApiError::InvalidToken(_))),
                "{bad:?} should be rejected as an invalid token"
            );
        }
    }

    #[test]
    fn test_authenticate_headers_attaches_claims() {
        let tokens = TokenService::new(b"gate-secret", Duration::from_secs(60));
        let token = tokens.issue("u1", Role::User).unwrap();

        let user = authenticate_headers(&headers_with(&format!("Bearer {token}")), &tokens).unwrap();
        assert_eq!(
            user,
            AuthUser {
                id: "u1".to_string(),
                role: Role::User
            }
        );
    }

    #[test]
    fn test_authorize_predicate() {
        let admin = AuthUser { id: "a".into(), role: Role::Admin };
        let user = AuthUser { id: "u".into(), role: Role::User };

        assert!(authorize(&admin, Role::Admin).is_ok());
        assert!(matches!(authorize(&user, Role::Admin), Err(ApiError::Forbidden)));
        assert!(authorize(&user, Role::User).is_ok());
    }
}
