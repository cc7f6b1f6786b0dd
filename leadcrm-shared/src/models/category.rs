/// Category model and database operations
///
/// Categories label leads inside one organization (e.g. "Contacted",
/// "Converted"). Names are not unique. Deleting a category leaves its leads
/// uncategorized.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE categories (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES user_profiles(id) ON DELETE CASCADE,
///     name VARCHAR(30) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub async fn create(
        pool: &PgPool,
        organization_id: Uuid,
        name: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (organization_id, name)
            VALUES ($1, $2)
            RETURNING id, organization_id, name, created_at
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .fetch_one(pool)
        .await
    }

    /// Finds a category of `organization_id`
    pub async fn find_in_organization(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, organization_id, name, created_at
            FROM categories
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await
    }

    /// Lists the categories of an organization by name
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, organization_id, name, created_at
            FROM categories
            WHERE organization_id = $1
            ORDER BY name, created_at
            "#,
        )
        .bind(organization_id)
        .fetch_all(pool)
        .await
    }

    /// Renames a category of `organization_id`
    pub async fn rename_in_organization(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = $3
            WHERE id = $1 AND organization_id = $2
            RETURNING id, organization_id, name, created_at
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a category of `organization_id`; its leads become uncategorized
    pub async fn delete_in_organization(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
