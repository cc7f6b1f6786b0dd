/// Lead model and database operations
///
/// A lead is a prospective customer owned by one organization. It may be
/// assigned to one of the organization's agents and labelled with one of its
/// categories; both references fall back to `NULL` when the target is deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE leads (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES user_profiles(id) ON DELETE CASCADE,
///     agent_id UUID REFERENCES agents(id) ON DELETE SET NULL,
///     category_id UUID REFERENCES categories(id) ON DELETE SET NULL,
///     first_name VARCHAR(20) NOT NULL,
///     last_name VARCHAR(20) NOT NULL,
///     age INTEGER NOT NULL DEFAULT 0 CHECK (age >= 0),
///     description TEXT NOT NULL DEFAULT '',
///     phone_number VARCHAR(20) NOT NULL DEFAULT '',
///     email VARCHAR(254) NOT NULL DEFAULT '',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Scoping
///
/// Apart from [`Lead::create`], every query takes a [`LeadScope`] and appends
/// its predicate to the `WHERE` clause. A lead outside the scope behaves
/// exactly like a missing one: `None`, `false` or absent from the list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::authorization::{AssignmentFilter, LeadScope};

const LEAD_COLUMNS: &str = "id, organization_id, agent_id, category_id, first_name, last_name, \
                            age, description, phone_number, email, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lead {
    pub id: Uuid,

    /// Owning organization (profile)
    pub organization_id: Uuid,

    /// Assigned agent, `None` while unassigned
    pub agent_id: Option<Uuid>,

    pub category_id: Option<Uuid>,

    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub description: String,
    pub phone_number: String,
    pub email: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a lead
///
/// New leads are always unassigned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateLead {
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
    pub description: String,
    pub phone_number: String,
    pub email: String,

    /// Must belong to the same organization; checked by the caller
    pub category_id: Option<Uuid>,
}

/// Field update of a lead; assignment and category have dedicated operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLead {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i32>,
    pub description: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

impl Lead {
    /// Creates an unassigned lead in an organization
    pub async fn create(
        pool: &PgPool,
        organization_id: Uuid,
        data: CreateLead,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Lead>(&format!(
            r#"
            INSERT INTO leads (organization_id, category_id, first_name, last_name,
                               age, description, phone_number, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {LEAD_COLUMNS}
            "#
        ))
        .bind(organization_id)
        .bind(data.category_id)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.age)
        .bind(data.description)
        .bind(data.phone_number)
        .bind(data.email)
        .fetch_one(pool)
        .await
    }

    /// Lists the leads of a scope, newest first
    pub async fn list(
        pool: &PgPool,
        scope: &LeadScope,
        filter: AssignmentFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lead>(&format!(
            r#"
            SELECT {LEAD_COLUMNS} FROM leads
            WHERE {}
              AND ($3::boolean IS NULL OR (agent_id IS NOT NULL) = $3)
            ORDER BY created_at DESC, id
            "#,
            LeadScope::SQL_PREDICATE
        ))
        .bind(scope.organization_id())
        .bind(scope.agent_id())
        .bind(filter.as_sql_flag())
        .fetch_all(pool)
        .await
    }

    /// Finds a lead through a scope
    pub async fn find(pool: &PgPool, scope: &LeadScope, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE {} AND id = $3",
            LeadScope::SQL_PREDICATE
        ))
        .bind(scope.organization_id())
        .bind(scope.agent_id())
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists the leads of a scope labelled with `category_id`
    pub async fn list_in_category(
        pool: &PgPool,
        scope: &LeadScope,
        category_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lead>(&format!(
            r#"
            SELECT {LEAD_COLUMNS} FROM leads
            WHERE {} AND category_id = $3
            ORDER BY created_at DESC, id
            "#,
            LeadScope::SQL_PREDICATE
        ))
        .bind(scope.organization_id())
        .bind(scope.agent_id())
        .bind(category_id)
        .fetch_all(pool)
        .await
    }

    /// Counts the leads of a scope without a category
    pub async fn count_uncategorized(pool: &PgPool, scope: &LeadScope) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM leads WHERE {} AND category_id IS NULL",
            LeadScope::SQL_PREDICATE
        ))
        .bind(scope.organization_id())
        .bind(scope.agent_id())
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Updates the `Some` fields of a lead in scope
    ///
    /// # Returns
    ///
    /// The updated lead, or `None` if it is not in scope
    pub async fn update(
        pool: &PgPool,
        scope: &LeadScope,
        id: Uuid,
        data: UpdateLead,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE leads SET updated_at = NOW()");
        let mut bind_count = 3;

        for (column, present) in [
            ("first_name", data.first_name.is_some()),
            ("last_name", data.last_name.is_some()),
            ("age", data.age.is_some()),
            ("description", data.description.is_some()),
            ("phone_number", data.phone_number.is_some()),
            ("email", data.email.is_some()),
        ] {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(&format!(
            " WHERE {} AND id = $3 RETURNING {LEAD_COLUMNS}",
            LeadScope::SQL_PREDICATE
        ));

        let mut q = sqlx::query_as::<_, Lead>(&query)
            .bind(scope.organization_id())
            .bind(scope.agent_id())
            .bind(id);

        // Binds must follow the column order above
        if let Some(first_name) = data.first_name {
            q = q.bind(first_name);
        }
        if let Some(last_name) = data.last_name {
            q = q.bind(last_name);
        }
        if let Some(age) = data.age {
            q = q.bind(age);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(phone_number) = data.phone_number {
            q = q.bind(phone_number);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }

        q.fetch_optional(pool).await
    }

    /// Sets the assigned agent of a lead in scope
    ///
    /// The agent must already be known to belong to the scope's organization.
    /// Assigning the current agent again is a no-op in effect.
    pub async fn assign_agent(
        pool: &PgPool,
        scope: &LeadScope,
        id: Uuid,
        agent_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lead>(&format!(
            r#"
            UPDATE leads SET agent_id = $4, updated_at = NOW()
            WHERE {} AND id = $3
            RETURNING {LEAD_COLUMNS}
            "#,
            LeadScope::SQL_PREDICATE
        ))
        .bind(scope.organization_id())
        .bind(scope.agent_id())
        .bind(id)
        .bind(agent_id)
        .fetch_optional(pool)
        .await
    }

    /// Sets or clears the category of a lead in scope
    pub async fn set_category(
        pool: &PgPool,
        scope: &LeadScope,
        id: Uuid,
        category_id: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lead>(&format!(
            r#"
            UPDATE leads SET category_id = $4, updated_at = NOW()
            WHERE {} AND id = $3
            RETURNING {LEAD_COLUMNS}
            "#,
            LeadScope::SQL_PREDICATE
        ))
        .bind(scope.organization_id())
        .bind(scope.agent_id())
        .bind(id)
        .bind(category_id)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a lead in scope
    pub async fn delete(pool: &PgPool, scope: &LeadScope, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&format!(
            "DELETE FROM leads WHERE {} AND id = $3",
            LeadScope::SQL_PREDICATE
        ))
        .bind(scope.organization_id())
        .bind(scope.agent_id())
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether `scope` admits this lead
    pub fn is_within(&self, scope: &LeadScope) -> bool {
        scope.admits(self.organization_id, self.agent_id)
    }

    pub fn is_assigned(&self) -> bool {
        self.agent_id.is_some()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(organization_id: Uuid, agent_id: Option<Uuid>) -> Lead {
        Lead {
            id: Uuid::new_v4(),
            organization_id,
            agent_id,
            category_id: None,
            first_name: "Jane".to_string(),
            last_name: "Roe".to_string(),
            age: 41,
            description: String::new(),
            phone_number: "555-0100".to_string(),
            email: "jane@example.com".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_within_organization_scope() {
        let org = Uuid::new_v4();
        let scope = LeadScope::organization(org);

        assert!(lead(org, None).is_within(&scope));
        assert!(lead(org, Some(Uuid::new_v4())).is_within(&scope));
        assert!(!lead(Uuid::new_v4(), None).is_within(&scope));
    }

    #[test]
    fn test_is_within_agent_scope() {
        let org = Uuid::new_v4();
        let agent = Uuid::new_v4();
        let scope = LeadScope::assigned_to(org, agent);

        assert!(lead(org, Some(agent)).is_within(&scope));
        assert!(!lead(org, None).is_within(&scope));
        assert!(!lead(org, Some(Uuid::new_v4())).is_within(&scope));
    }

    #[test]
    fn test_assignment_helpers() {
        let org = Uuid::new_v4();
        assert!(!lead(org, None).is_assigned());
        assert!(lead(org, Some(Uuid::new_v4())).is_assigned());
        assert_eq!(lead(org, None).full_name(), "Jane Roe");
    }

    #[test]
    fn test_scope_predicate_binds_two_params() {
        assert!(LeadScope::SQL_PREDICATE.contains("$1"));
        assert!(LeadScope::SQL_PREDICATE.contains("$2"));
        assert!(!LeadScope::SQL_PREDICATE.contains("$3"));
    }
}
