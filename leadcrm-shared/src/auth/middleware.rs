/// Request authentication
///
/// Turns the `Authorization: Bearer <token>` header into an [`AuthContext`]
/// carrying only the authenticated user id. Handlers resolve the user's role
/// and organization from that id explicitly (see
/// [`Actor::resolve`](super::authorization::Actor::resolve)); nothing about
/// tenancy is read from ambient request state.
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use leadcrm_shared::auth::jwt::{create_token, Claims, TokenType};
/// use leadcrm_shared::auth::middleware::authenticate;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "your-secret-key-at-least-32-bytes";
/// let user_id = Uuid::new_v4();
/// let token = create_token(&Claims::new(user_id, TokenType::Access), secret)?;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
///
/// let auth = authenticate(&headers, secret)?;
/// assert_eq!(auth.user_id, user_id);
/// # Ok(())
/// # }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// Authenticated identity inserted into request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Error type for request authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header is not a bearer token
    #[error("{0}")]
    InvalidFormat(String),

    /// Token failed validation
    #[error("{0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
            other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
        }
    }
}

/// Extracts the raw bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates the bearer access token in `headers`
///
/// # Errors
///
/// - `AuthError::MissingCredentials` without an Authorization header
/// - `AuthError::InvalidFormat` if it is not a bearer token
/// - `AuthError::InvalidToken` if validation fails or a refresh token is used
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_access_token(token, secret)?;

    Ok(AuthContext::new(claims.sub))
}
