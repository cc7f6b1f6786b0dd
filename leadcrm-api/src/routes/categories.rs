/// Category endpoints
///
/// Categories belong to an organization. Organizers manage them; agents of
/// the same organization may read them. Lead lists and counts attached to a
/// category only include leads the caller can see.
///
/// # Endpoints
///
/// - `GET /v1/categories` - List categories (organizer, agent)
/// - `POST /v1/categories` - Create category (organizer)
/// - `GET /v1/categories/:id` - Category with its leads (organizer, agent)
/// - `PUT /v1/categories/:id` - Rename category (organizer)
/// - `DELETE /v1/categories/:id` - Delete category (organizer)

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
    auth::authorization::Actor,
    models::{category::Category, lead::Lead},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create or rename request
#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 30, message = "Name must be 1-30 characters"))]
    pub name: String,
}

/// Category list response
#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,

    /// Visible leads without a category
    pub uncategorized_lead_count: i64,
}

/// Category detail response
#[derive(Debug, Serialize)]
pub struct CategoryDetailResponse {
    #[serde(flatten)]
    pub category: Category,

    /// Visible leads in this category
    pub leads: Vec<Lead>,
}

fn category_not_found() -> ApiError {
    ApiError::NotFound("Category not found".to_string())
}

/// Lists the categories of the caller's organization
///
/// # Response
///
/// ```json
/// {
///   "categories": [{ "id": "uuid", "organization_id": "uuid", "name": "Contacted", ... }],
///   "uncategorized_lead_count": 3
/// }
/// ```
pub async fn list_categories(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<CategoryListResponse>> {
    let organization_id = actor.organization_id()?;
    let scope = actor.lead_scope()?;

    Ok(Json(CategoryListResponse {
        categories: Category::list_by_organization(&state.db, organization_id).await?,
        uncategorized_lead_count: Lead::count_uncategorized(&state.db, &scope).await?,
    }))
}

/// Creates a category
///
/// # Endpoint
///
/// ```text
/// POST /v1/categories
/// Authorization: Bearer <token>
/// Content-Type: application/json
///
/// { "name": "Contacted" }
/// ```
pub async fn create_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(req): ApiJson<CategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let organization_id = actor.require_organizer()?;

    req.validate()?;

    let category = Category::create(&state.db, organization_id, &req.name).await?;

    tracing::info!(category_id = %category.id, %organization_id, "Category created");

    Ok((StatusCode::CREATED, Json(category)))
}

/// Returns a category and the caller's leads in it
///
/// # Errors
///
/// - `404 Not Found`: Category not in the caller's organization
pub async fn get_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<CategoryDetailResponse>> {
    let organization_id = actor.organization_id()?;
    let scope = actor.lead_scope()?;

    let category = Category::find_in_organization(&state.db, id, organization_id)
        .await?
        .ok_or_else(category_not_found)?;

    let leads = Lead::list_in_category(&state.db, &scope, category.id).await?;

    Ok(Json(CategoryDetailResponse { category, leads }))
}

/// Renames a category
pub async fn rename_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CategoryRequest>,
) -> ApiResult<Json<Category>> {
    let organization_id = actor.require_organizer()?;

    req.validate()?;

    let category = Category::rename_in_organization(&state.db, id, organization_id, &req.name)
        .await?
        .ok_or_else(category_not_found)?;

    Ok(Json(category))
}

/// Deletes a category; its leads become uncategorized
///
/// # Response
///
/// `204 No Content`
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    let organization_id = actor.require_organizer()?;

    if !Category::delete_in_organization(&state.db, id, organization_id).await? {
        return Err(category_not_found());
    }

    tracing::info!(category_id = %id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_category_request_validation() {
        assert!(CategoryRequest { name: "Contacted".to_string() }.validate().is_ok());
        assert!(CategoryRequest { name: String::new() }.validate().is_err());
        assert!(CategoryRequest { name: "x".repeat(31) }.validate().is_err());
    }

    #[test]
    fn test_detail_response_is_flat() {
        let category = Category {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: "Converted".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(CategoryDetailResponse {
            category,
            leads: Vec::new(),
        })
        .unwrap();

        assert_eq!(json["name"], "Converted");
        assert!(json["leads"].is_array());
    }
}
