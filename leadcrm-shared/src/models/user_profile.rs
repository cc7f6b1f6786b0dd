/// Organization profile
///
/// One profile per user, created by [`User::create`](super::user::User::create)
/// and nowhere else. An organizer's profile is their organization: agents,
/// categories and leads all reference it as `organization_id`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_profiles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    /// Profile ID, the organization key
    pub id: Uuid,

    /// Owning user (unique)
    pub user_id: Uuid,

    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Inserts the profile of a freshly created user
    ///
    /// The unique constraint on `user_id` makes a second profile for the same
    /// user impossible.
    pub(crate) async fn create_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id)
            VALUES ($1)
            RETURNING id, user_id, created_at
            "#,
        )
        .bind(user_id)
        .fetch_one(conn)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            "SELECT id, user_id, created_at FROM user_profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            "SELECT id, user_id, created_at FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Number of profiles a user has; always 1 for an existing user
    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
