/// Agent management endpoints
///
/// Organizer only. Agents are looked up inside the organizer's organization;
/// an agent of another organization answers `404`.
///
/// # Endpoints
///
/// - `GET /v1/agents` - List agents
/// - `POST /v1/agents` - Invite a new agent
/// - `GET /v1/agents/:id` - Agent detail
/// - `PUT /v1/agents/:id` - Update the agent's account fields
/// - `DELETE /v1/agents/:id` - Remove the agent and its login account

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use leadcrm_shared::{
    auth::{authorization::Actor, password},
    models::{
        agent::Agent,
        user::{CreateUser, UpdateUser, User, UserRole},
    },
    notify::Notification,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Invite agent request
#[derive(Debug, Deserialize, Validate)]
pub struct InviteAgentRequest {
    #[validate(length(min = 1, max = 150, message = "Username must be 1-150 characters"))]
    pub username: String,

    /// Receives the invitation and initial password
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: String,
}

/// Update agent request; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAgentRequest {
    #[validate(length(min = 1, max = 150, message = "Username must be 1-150 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: Option<String>,
}

fn agent_not_found() -> ApiError {
    ApiError::NotFound("Agent not found".to_string())
}

/// Lists the organizer's agents
pub async fn list_agents(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<Agent>>> {
    let organization_id = actor.require_organizer()?;

    Ok(Json(
        Agent::list_by_organization(&state.db, organization_id).await?,
    ))
}

/// Invites a new agent into the organizer's organization
///
/// Creates the agent's user account (with its profile) and the agent record
/// in one transaction. The account gets a random initial password that is
/// only sent to the agent by email, never returned here.
///
/// # Endpoint
///
/// ```text
/// POST /v1/agents
/// Authorization: Bearer <token>
/// Content-Type: application/json
///
/// {
///   "username": "jsmith",
///   "email": "jsmith@acme.test",
///   "first_name": "John",
///   "last_name": "Smith"
/// }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "id": "uuid",
///   "user_id": "uuid",
///   "organization_id": "uuid",
///   "username": "jsmith",
///   "email": "jsmith@acme.test",
///   "first_name": "John",
///   "last_name": "Smith",
///   "created_at": "2025-01-01T00:00:00Z"
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an organizer
/// - `409 Conflict`: Username or email already exists
/// - `422 Unprocessable Entity`: Validation failed
pub async fn invite_agent(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(req): ApiJson<InviteAgentRequest>,
) -> ApiResult<(StatusCode, Json<Agent>)> {
    let organization_id = actor.require_organizer()?;

    req.validate()?;

    let initial_password = password::generate_initial_password();
    let password_hash = password::hash_password(&initial_password)?;

    let mut tx = state.db.begin().await?;

    let (user, _profile) = User::create_in(
        &mut *tx,
        CreateUser {
            username: req.username,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
            role: UserRole::Agent,
        },
    )
    .await?;

    let agent = Agent::create_in(&mut *tx, user.id, organization_id).await?;

    tx.commit().await?;

    tracing::info!(agent_id = %agent.id, %organization_id, "Agent invited");

    state.notify(Notification::agent_invitation(
        &state.config.mail.invite_from,
        &agent.email,
        &agent.username,
        &initial_password,
    ));

    Ok((StatusCode::CREATED, Json(agent)))
}

/// Returns one agent of the organizer's organization
pub async fn get_agent(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Agent>> {
    let organization_id = actor.require_organizer()?;

    let agent = Agent::find_in_organization(&state.db, id, organization_id)
        .await?
        .ok_or_else(agent_not_found)?;

    Ok(Json(agent))
}

/// Updates the account fields of an agent
///
/// # Errors
///
/// - `404 Not Found`: Agent not in the caller's organization
/// - `409 Conflict`: Username or email already exists
pub async fn update_agent(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateAgentRequest>,
) -> ApiResult<Json<Agent>> {
    let organization_id = actor.require_organizer()?;

    req.validate()?;

    let agent = Agent::find_in_organization(&state.db, id, organization_id)
        .await?
        .ok_or_else(agent_not_found)?;

    let update = UpdateUser {
        username: req.username,
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        password_hash: None,
    };

    if !update.is_empty() {
        User::update(&state.db, agent.user_id, update)
            .await?
            .ok_or_else(agent_not_found)?;
    }

    let agent = Agent::find_in_organization(&state.db, id, organization_id)
        .await?
        .ok_or_else(agent_not_found)?;

    Ok(Json(agent))
}

/// Removes an agent and its login account
///
/// Leads assigned to the agent are kept and become unassigned.
///
/// # Response
///
/// `204 No Content`
pub async fn delete_agent(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    let organization_id = actor.require_organizer()?;

    if !Agent::delete_in_organization(&state.db, id, organization_id).await? {
        return Err(agent_not_found());
    }

    tracing::info!(agent_id = %id, %organization_id, "Agent removed");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_request_validation() {
        let req: InviteAgentRequest = serde_json::from_str(
            r#"{"username": "jsmith", "email": "jsmith@acme.test"}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert!(req.first_name.is_empty());

        let req: InviteAgentRequest =
            serde_json::from_str(r#"{"username": "", "email": "nope"}"#).unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_invite_request_has_no_password_field() {
        // Unknown fields are ignored; the password is always generated
        let req: InviteAgentRequest = serde_json::from_str(
            r#"{"username": "jsmith", "email": "jsmith@acme.test", "password": "chosen"}"#,
        )
        .unwrap();
        assert_eq!(req.username, "jsmith");
    }

    #[test]
    fn test_update_request_partial() {
        let req: UpdateAgentRequest =
            serde_json::from_str(r#"{"first_name": "Johnny"}"#).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.email.is_none());
    }
}
