/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/signup` - Create an organizer account
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Refresh access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{extract::State, http::StatusCode, Json};
use leadcrm_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, User, UserRole},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Signup request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 150, message = "Username must be 1-150 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: String,

    /// Password (will be validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Tokens issued on signup and login
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub user_id: Uuid,

    pub role: UserRole,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

fn issue_tokens(state: &AppState, user: &User) -> ApiResult<TokenResponse> {
    let access_claims = jwt::Claims::new(user.id, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user.id, jwt::TokenType::Refresh);

    Ok(TokenResponse {
        user_id: user.id,
        role: user.role,
        access_token: jwt::create_token(&access_claims, state.jwt_secret())?,
        refresh_token: jwt::create_token(&refresh_claims, state.jwt_secret())?,
    })
}

/// Signs up a new organizer
///
/// The account's profile is the new organization.
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/signup
/// Content-Type: application/json
///
/// {
///   "username": "acme",
///   "email": "owner@acme.test",
///   "first_name": "Ada",
///   "last_name": "Owner",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "user_id": "uuid",
///   "role": "organizer",
///   "access_token": "eyJ...",
///   "refresh_token": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Username or email already exists
/// - `422 Unprocessable Entity`: Validation failed
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    req.validate()?;

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::validation("password", e))?;

    let password_hash = password::hash_password(&req.password)?;

    let (user, profile) = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
            role: UserRole::Organizer,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, organization_id = %profile.id, "Organizer signed up");

    Ok((StatusCode::CREATED, Json(issue_tokens(&state, &user)?)))
}

/// Logs in with username and password
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "username": "acme",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid username or password".to_string());

    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(invalid());
    }

    tracing::debug!(user_id = %user.id, "User logged in");

    Ok(Json(issue_tokens(&state, &user)?))
}

/// Exchanges a refresh token for a new access token
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/refresh
/// Content-Type: application/json
///
/// { "refresh_token": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_request_validation() {
        let valid = SignupRequest {
            username: "acme".to_string(),
            email: "owner@acme.test".to_string(),
            first_name: "Ada".to_string(),
            last_name: String::new(),
            password: "SecureP@ss123".to_string(),
        };
        assert!(valid.validate().is_ok());

        let invalid = SignupRequest {
            username: String::new(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            ..valid
        };
        let errors = invalid.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_login_request_requires_username() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"username": "", "password": "x"}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
