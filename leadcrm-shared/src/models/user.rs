/// User model and database operations
///
/// A user is an identity with exactly one role. Creating a user always
/// creates its [`UserProfile`] in the same transaction; there is no other way
/// to obtain a profile.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('organizer', 'agent', 'unassigned');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(150) NOT NULL UNIQUE,
///     email VARCHAR(254) NOT NULL UNIQUE,
///     first_name VARCHAR(150) NOT NULL DEFAULT '',
///     last_name VARCHAR(150) NOT NULL DEFAULT '',
///     password_hash VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'unassigned',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use leadcrm_shared::models::user::{CreateUser, User, UserRole};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let (user, profile) = User::create(&pool, CreateUser {
///     username: "alice".to_string(),
///     email: "alice@example.com".to_string(),
///     first_name: "Alice".to_string(),
///     last_name: "Smith".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: UserRole::Organizer,
/// }).await?;
///
/// assert_eq!(profile.user_id, user.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::user_profile::UserProfile;

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, role, created_at, updated_at";

/// The single role a user holds
///
/// `Unassigned` covers accounts that are neither organizer nor agent (for
/// example an agent whose agent record was removed). Such users are refused by
/// every organization-scoped operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Owns an organization: manages agents, categories and all leads
    Organizer,

    /// Works the leads assigned to them inside one organization
    Agent,

    /// No role
    Unassigned,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Organizer => "organizer",
            UserRole::Agent => "agent",
            UserRole::Unassigned => "unassigned",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "organizer" => Some(UserRole::Organizer),
            "agent" => Some(UserRole::Agent),
            "unassigned" => Some(UserRole::Unassigned),
            _ => None,
        }
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Login name, unique
    pub username: String,

    /// Email address, unique; notifications are sent here
    pub email: String,

    pub first_name: String,

    pub last_name: String,

    /// Argon2id password hash, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub role: UserRole,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,

    /// Argon2id password hash (not the plaintext)
    pub password_hash: String,

    pub role: UserRole,
}

/// Input for updating a user; only `Some` fields are written
///
/// The role is deliberately absent: it is fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: Option<String>,
}

impl UpdateUser {
    /// True when no field would be written
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.password_hash.is_none()
    }
}

impl User {
    /// Creates a user together with its profile in one transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the username or email is taken (unique constraint
    /// violation) or the database is unreachable. Nothing is persisted on
    /// error.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<(Self, UserProfile), sqlx::Error> {
        let mut tx = pool.begin().await?;
        let created = Self::create_in(&mut *tx, data).await?;
        tx.commit().await?;

        Ok(created)
    }

    /// Creates a user and its profile on an existing connection
    ///
    /// Used by workflows that need the user inside a larger transaction (agent
    /// invitation). Callers own the transaction.
    pub async fn create_in(
        conn: &mut PgConnection,
        data: CreateUser,
    ) -> Result<(Self, UserProfile), sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, first_name, last_name, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.username)
        .bind(data.email)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.password_hash)
        .bind(data.role)
        .fetch_one(&mut *conn)
        .await?;

        let profile = UserProfile::create_for_user(&mut *conn, user.id).await?;

        tracing::debug!(user_id = %user.id, profile_id = %profile.id, role = user.role.as_str(), "Created user");

        Ok((user, profile))
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by login name
    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Updates the `Some` fields of a user
    ///
    /// Saving a user never touches its profile.
    ///
    /// # Returns
    ///
    /// The updated user, or `None` if it does not exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        for (column, present) in [
            ("username", data.username.is_some()),
            ("email", data.email.is_some()),
            ("first_name", data.first_name.is_some()),
            ("last_name", data.last_name.is_some()),
            ("password_hash", data.password_hash.is_some()),
        ] {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        for value in [
            data.username,
            data.email,
            data.first_name,
            data.last_name,
            data.password_hash,
        ]
        .into_iter()
        .flatten()
        {
            q = q.bind(value);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a user
    ///
    /// Cascades to the profile, to an agent record, and (for organizers) to
    /// every record of their organization.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Display name, falling back to the username
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: UserRole::Organizer,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_role_as_str() {
        assert_eq!(UserRole::Organizer.as_str(), "organizer");
        assert_eq!(UserRole::Agent.as_str(), "agent");
        assert_eq!(UserRole::Unassigned.as_str(), "unassigned");
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!(UserRole::from_str("organizer"), Some(UserRole::Organizer));
        assert_eq!(UserRole::from_str("agent"), Some(UserRole::Agent));
        assert_eq!(UserRole::from_str("unassigned"), Some(UserRole::Unassigned));
        assert_eq!(UserRole::from_str("admin"), None);
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();

        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "organizer");
    }

    #[test]
    fn test_display_name() {
        let mut user = sample_user();
        assert_eq!(user.display_name(), "John Doe");

        user.first_name.clear();
        user.last_name.clear();
        assert_eq!(user.display_name(), "jdoe");
    }

    #[test]
    fn test_update_user_is_empty() {
        assert!(UpdateUser::default().is_empty());

        let update = UpdateUser {
            email: Some("new@example.com".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
