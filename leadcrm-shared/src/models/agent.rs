/// Agent model and database operations
///
/// An agent links a user with the `agent` role to exactly one organization.
/// Rows are always read joined with their user so callers get the contact
/// fields in one query.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE agents (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
///     organization_id UUID NOT NULL REFERENCES user_profiles(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Every lookup used by request handlers takes the organization and filters
/// on it in SQL, so an agent of another organization is indistinguishable
/// from a missing one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const AGENT_SELECT: &str = r#"
    SELECT a.id, a.user_id, a.organization_id, u.username, u.email,
           u.first_name, u.last_name, a.created_at
    FROM agents a
    JOIN users u ON u.id = a.user_id
"#;

/// Agent with the contact fields of its user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Agent {
    pub id: Uuid,

    /// The agent's login account
    pub user_id: Uuid,

    /// Organization (profile) the agent works for
    pub organization_id: Uuid,

    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,

    pub created_at: DateTime<Utc>,
}

impl Agent {
    /// Links an existing user to an organization
    ///
    /// Runs on the caller's connection so it can share the invitation
    /// transaction with the user insert.
    pub async fn create_in(
        conn: &mut PgConnection,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Agent>(
            r#"
            WITH inserted AS (
                INSERT INTO agents (user_id, organization_id)
                VALUES ($1, $2)
                RETURNING id, user_id, organization_id, created_at
            )
            SELECT a.id, a.user_id, a.organization_id, u.username, u.email,
                   u.first_name, u.last_name, a.created_at
            FROM inserted a
            JOIN users u ON u.id = a.user_id
            "#,
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_one(conn)
        .await
    }

    /// Finds the agent record of a user, in any organization
    ///
    /// Only used to resolve the acting identity of a request.
    pub async fn find_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Agent>(&format!("{AGENT_SELECT} WHERE a.user_id = $1"))
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Finds an agent of `organization_id`
    pub async fn find_in_organization(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Agent>(&format!(
            "{AGENT_SELECT} WHERE a.id = $1 AND a.organization_id = $2"
        ))
        .bind(id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await
    }

    /// Lists the agents of an organization, oldest first
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Agent>(&format!(
            "{AGENT_SELECT} WHERE a.organization_id = $1 ORDER BY a.created_at, a.id"
        ))
        .bind(organization_id)
        .fetch_all(pool)
        .await
    }

    /// Deletes an agent of `organization_id` together with its login account
    ///
    /// Removing the user cascades to the agent row, and leads assigned to the
    /// agent fall back to unassigned (`ON DELETE SET NULL`). The leads
    /// themselves are kept.
    ///
    /// # Returns
    ///
    /// False if no such agent exists in the organization
    pub async fn delete_in_organization(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM users
            WHERE id = (
                SELECT user_id FROM agents
                WHERE id = $1 AND organization_id = $2
            )
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
