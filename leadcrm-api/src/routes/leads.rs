/// Lead endpoints
///
/// Every handler resolves its records through the caller's
/// [`LeadScope`](leadcrm_shared::auth::authorization::LeadScope): organizers
/// see their organization's leads, agents only the leads assigned to them.
/// A lead outside the scope answers `404` exactly like a missing one.
///
/// # Endpoints
///
/// - `GET /v1/leads` - List leads (organizer, agent)
/// - `POST /v1/leads` - Create lead (organizer)
/// - `GET /v1/leads/:id` - Lead detail (organizer, agent)
/// - `PUT /v1/leads/:id` - Update lead (organizer)
/// - `DELETE /v1/leads/:id` - Delete lead (organizer)
/// - `POST /v1/leads/:id/assign` - Assign lead to an agent (organizer)
/// - `PUT /v1/leads/:id/category` - Change lead category (organizer, agent)

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
    auth::authorization::{Actor, AssignmentFilter},
    models::{
        agent::Agent,
        category::Category,
        lead::{CreateLead, Lead, UpdateLead},
        user::User,
    },
    notify::Notification,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create lead request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLeadRequest {
    #[validate(length(min = 1, max = 20, message = "First name must be 1-20 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 20, message = "Last name must be 1-20 characters"))]
    pub last_name: String,

    #[serde(default)]
    #[validate(range(min = 0, message = "Age must not be negative"))]
    pub age: i32,

    #[serde(default)]
    pub description: String,

    #[validate(length(min = 1, max = 20, message = "Phone number must be 1-20 characters"))]
    pub phone_number: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Optional category of the caller's organization
    pub category_id: Option<Uuid>,
}

/// Update lead request; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLeadRequest {
    #[validate(length(min = 1, max = 20, message = "First name must be 1-20 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 20, message = "Last name must be 1-20 characters"))]
    pub last_name: Option<String>,

    #[validate(range(min = 0, message = "Age must not be negative"))]
    pub age: Option<i32>,

    pub description: Option<String>,

    #[validate(length(min = 1, max = 20, message = "Phone number must be 1-20 characters"))]
    pub phone_number: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

/// Assign lead request
#[derive(Debug, Deserialize)]
pub struct AssignLeadRequest {
    /// Agent of the caller's organization
    pub agent_id: Uuid,
}

/// Lead category request; `null` clears the category
#[derive(Debug, Deserialize)]
pub struct UpdateLeadCategoryRequest {
    pub category_id: Option<Uuid>,
}

/// Lead list response
///
/// Organizers get their assigned leads in `leads` and the rest in
/// `unassigned_leads`; agents get only `leads`.
#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    pub leads: Vec<Lead>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unassigned_leads: Option<Vec<Lead>>,
}

fn lead_not_found() -> ApiError {
    ApiError::NotFound("Lead not found".to_string())
}

/// Checks that `category_id` names a category of `organization_id`
async fn ensure_category(
    state: &AppState,
    category_id: Option<Uuid>,
    organization_id: Uuid,
) -> ApiResult<()> {
    if let Some(category_id) = category_id {
        Category::find_in_organization(&state.db, category_id, organization_id)
            .await?
            .ok_or_else(|| {
                ApiError::validation("category_id", "Select a category of your organization")
            })?;
    }

    Ok(())
}

/// Lists the leads visible to the caller
///
/// # Endpoint
///
/// ```text
/// GET /v1/leads
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "leads": [{ "id": "uuid", "first_name": "Jane", "agent_id": "uuid", ... }],
///   "unassigned_leads": [{ "id": "uuid", "first_name": "John", "agent_id": null, ... }]
/// }
/// ```
pub async fn list_leads(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<LeadListResponse>> {
    let scope = actor.lead_scope()?;

    let response = if actor.is_organizer() {
        LeadListResponse {
            leads: Lead::list(&state.db, &scope, AssignmentFilter::Assigned).await?,
            unassigned_leads: Some(
                Lead::list(&state.db, &scope, AssignmentFilter::Unassigned).await?,
            ),
        }
    } else {
        LeadListResponse {
            leads: Lead::list(&state.db, &scope, AssignmentFilter::Any).await?,
            unassigned_leads: None,
        }
    };

    Ok(Json(response))
}

/// Creates an unassigned lead and notifies the organizer
///
/// # Endpoint
///
/// ```text
/// POST /v1/leads
/// Authorization: Bearer <token>
/// Content-Type: application/json
///
/// {
///   "first_name": "Jane",
///   "last_name": "Roe",
///   "age": 41,
///   "description": "Met at the expo",
///   "phone_number": "555-0100",
///   "email": "jane@example.com",
///   "category_id": null
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an organizer
/// - `422 Unprocessable Entity`: Validation failed or unknown category
pub async fn create_lead(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(req): ApiJson<CreateLeadRequest>,
) -> ApiResult<(StatusCode, Json<Lead>)> {
    let organization_id = actor.require_organizer()?;

    req.validate()?;
    ensure_category(&state, req.category_id, organization_id).await?;

    let lead = Lead::create(
        &state.db,
        organization_id,
        CreateLead {
            first_name: req.first_name,
            last_name: req.last_name,
            age: req.age,
            description: req.description,
            phone_number: req.phone_number,
            email: req.email,
            category_id: req.category_id,
        },
    )
    .await?;

    tracing::info!(lead_id = %lead.id, %organization_id, "Lead created");

    match User::find_by_id(&state.db, actor.user_id()).await? {
        Some(organizer) => state.notify(Notification::lead_created(
            &state.config.mail.leads_from,
            &organizer.email,
            &lead.full_name(),
        )),
        None => tracing::warn!(user_id = %actor.user_id(), "Organizer vanished, lead notification skipped"),
    }

    Ok((StatusCode::CREATED, Json(lead)))
}

/// Returns one lead
///
/// # Errors
///
/// - `404 Not Found`: Lead does not exist or is not visible to the caller
pub async fn get_lead(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Lead>> {
    let scope = actor.lead_scope()?;

    let lead = Lead::find(&state.db, &scope, id)
        .await?
        .ok_or_else(lead_not_found)?;

    Ok(Json(lead))
}

/// Updates lead fields
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an organizer
/// - `404 Not Found`: Lead not in the caller's organization
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_lead(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateLeadRequest>,
) -> ApiResult<Json<Lead>> {
    let scope = actor.organizer_lead_scope()?;

    req.validate()?;

    let lead = Lead::update(
        &state.db,
        &scope,
        id,
        UpdateLead {
            first_name: req.first_name,
            last_name: req.last_name,
            age: req.age,
            description: req.description,
            phone_number: req.phone_number,
            email: req.email,
        },
    )
    .await?
    .ok_or_else(lead_not_found)?;

    Ok(Json(lead))
}

/// Deletes a lead
///
/// # Response
///
/// `204 No Content`
pub async fn delete_lead(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    let scope = actor.organizer_lead_scope()?;

    if !Lead::delete(&state.db, &scope, id).await? {
        return Err(lead_not_found());
    }

    tracing::info!(lead_id = %id, "Lead deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Assigns a lead to one of the organizer's agents
///
/// Assigning the current agent again succeeds and changes nothing.
///
/// # Endpoint
///
/// ```text
/// POST /v1/leads/:id/assign
/// Authorization: Bearer <token>
/// Content-Type: application/json
///
/// { "agent_id": "uuid" }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an organizer
/// - `404 Not Found`: Lead not in the caller's organization
/// - `422 Unprocessable Entity`: `agent_id` is not an agent of the organization
pub async fn assign_lead(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AssignLeadRequest>,
) -> ApiResult<Json<Lead>> {
    let scope = actor.organizer_lead_scope()?;

    Lead::find(&state.db, &scope, id)
        .await?
        .ok_or_else(lead_not_found)?;

    let agent = Agent::find_in_organization(&state.db, req.agent_id, scope.organization_id())
        .await?
        .ok_or_else(|| ApiError::validation("agent_id", "Select an agent of your organization"))?;

    let lead = Lead::assign_agent(&state.db, &scope, id, agent.id)
        .await?
        .ok_or_else(lead_not_found)?;

    tracing::info!(lead_id = %lead.id, agent_id = %agent.id, "Lead assigned");

    Ok(Json(lead))
}

/// Sets or clears the category of a lead
///
/// Agents may re-categorize the leads assigned to them.
///
/// # Endpoint
///
/// ```text
/// PUT /v1/leads/:id/category
/// Authorization: Bearer <token>
/// Content-Type: application/json
///
/// { "category_id": "uuid" }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Lead not visible to the caller
/// - `422 Unprocessable Entity`: Category not in the lead's organization
pub async fn update_lead_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateLeadCategoryRequest>,
) -> ApiResult<Json<Lead>> {
    let scope = actor.lead_scope()?;

    let lead = Lead::find(&state.db, &scope, id)
        .await?
        .ok_or_else(lead_not_found)?;

    ensure_category(&state, req.category_id, lead.organization_id).await?;

    let lead = Lead::set_category(&state.db, &scope, id, req.category_id)
        .await?
        .ok_or_else(lead_not_found)?;

    Ok(Json(lead))
}
