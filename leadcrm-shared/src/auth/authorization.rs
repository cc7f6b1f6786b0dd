/// Authorization: who is acting, and which records they may touch
///
/// Every request is resolved once into an [`Actor`] from the authenticated
/// user id. The actor then yields scopes that the model layer applies inside
/// its SQL `WHERE` clauses, so records outside the scope are never loaded at
/// all; callers see a missing row, not a permission error.
///
/// # Rules
///
/// | Record | Organizer | Agent | Unassigned |
/// |---|---|---|---|
/// | Lead (read) | own organization | own organization AND assigned to self | forbidden |
/// | Lead (create/update/delete/assign) | own organization | forbidden | forbidden |
/// | Lead category | own organization | own organization AND assigned to self | forbidden |
/// | Category (read) | own organization | own organization | forbidden |
/// | Category (write) | own organization | forbidden | forbidden |
/// | Agent | own organization | forbidden | forbidden |
///
/// # Example
///
/// ```no_run
/// use leadcrm_shared::auth::authorization::{Actor, AssignmentFilter};
/// use leadcrm_shared::models::lead::Lead;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let actor = Actor::resolve(&pool, user_id).await?;
/// let scope = actor.lead_scope()?;
///
/// let visible = Lead::list(&pool, &scope, AssignmentFilter::Any).await?;
/// assert!(visible.iter().all(|lead| lead.is_within(&scope)));
/// # Ok(())
/// # }
/// ```

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    agent::Agent,
    user::{User, UserRole},
    user_profile::UserProfile,
};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Token refers to a user that no longer exists
    #[error("User {0} does not exist")]
    UnknownUser(Uuid),

    /// User is neither an organizer nor a linked agent
    #[error("User {0} is neither an organizer nor an agent")]
    NoRole(Uuid),

    /// Action is reserved to organizers
    #[error("Only organizers may perform this action")]
    OrganizerRequired,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// The resolved identity behind a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Actor {
    /// Owner of the organization identified by their profile
    Organizer { user_id: Uuid, organization_id: Uuid },

    /// Agent working inside one organization
    Agent {
        user_id: Uuid,
        agent_id: Uuid,
        organization_id: Uuid,
    },

    /// Account with no usable role
    Unassigned { user_id: Uuid },
}

impl Actor {
    /// Loads the user behind `user_id` and resolves their actor
    ///
    /// A user stored with the agent role but without an agent record resolves
    /// to `Unassigned`.
    ///
    /// # Errors
    ///
    /// - `AuthzError::UnknownUser` if the user does not exist
    /// - `AuthzError::DatabaseError` on query failure
    pub async fn resolve(pool: &PgPool, user_id: Uuid) -> Result<Self, AuthzError> {
        let user = User::find_by_id(pool, user_id)
            .await?
            .ok_or(AuthzError::UnknownUser(user_id))?;

        let actor = match user.role {
            UserRole::Organizer => {
                let profile = UserProfile::find_by_user_id(pool, user.id).await?;
                Self::from_records(&user, profile.as_ref(), None)
            }
            UserRole::Agent => {
                let agent = Agent::find_by_user_id(pool, user.id).await?;
                Self::from_records(&user, None, agent.as_ref())
            }
            UserRole::Unassigned => Actor::Unassigned { user_id: user.id },
        };

        if matches!(actor, Actor::Unassigned { .. }) && user.role != UserRole::Unassigned {
            tracing::warn!(
                user_id = %user.id,
                role = user.role.as_str(),
                "User role has no backing record, treating as unassigned"
            );
        }

        Ok(actor)
    }

    /// Builds the actor from already loaded records
    pub fn from_records(user: &User, profile: Option<&UserProfile>, agent: Option<&Agent>) -> Self {
        match (user.role, profile, agent) {
            (UserRole::Organizer, Some(profile), _) if profile.user_id == user.id => {
                Actor::Organizer {
                    user_id: user.id,
                    organization_id: profile.id,
                }
            }
            (UserRole::Agent, _, Some(agent)) if agent.user_id == user.id => Actor::Agent {
                user_id: user.id,
                agent_id: agent.id,
                organization_id: agent.organization_id,
            },
            _ => Actor::Unassigned { user_id: user.id },
        }
    }

    pub fn user_id(&self) -> Uuid {
        match *self {
            Actor::Organizer { user_id, .. }
            | Actor::Agent { user_id, .. }
            | Actor::Unassigned { user_id } => user_id,
        }
    }

    pub fn is_organizer(&self) -> bool {
        matches!(self, Actor::Organizer { .. })
    }

    /// Organization whose shared records (categories) the actor may read
    pub fn organization_id(&self) -> Result<Uuid, AuthzError> {
        match *self {
            Actor::Organizer { organization_id, .. } | Actor::Agent { organization_id, .. } => {
                Ok(organization_id)
            }
            Actor::Unassigned { user_id } => Err(AuthzError::NoRole(user_id)),
        }
    }

    /// Requires the organizer role and returns the organization it owns
    ///
    /// Checked before any record lookup for every mutating operation.
    pub fn require_organizer(&self) -> Result<Uuid, AuthzError> {
        match *self {
            Actor::Organizer { organization_id, .. } => Ok(organization_id),
            Actor::Agent { .. } => Err(AuthzError::OrganizerRequired),
            Actor::Unassigned { user_id } => Err(AuthzError::NoRole(user_id)),
        }
    }

    /// Leads the actor may see
    ///
    /// Agents always get the organization filter *and* the assignment filter.
    pub fn lead_scope(&self) -> Result<LeadScope, AuthzError> {
        match *self {
            Actor::Organizer { organization_id, .. } => Ok(LeadScope::organization(organization_id)),
            Actor::Agent {
                agent_id,
                organization_id,
                ..
            } => Ok(LeadScope::assigned_to(organization_id, agent_id)),
            Actor::Unassigned { user_id } => Err(AuthzError::NoRole(user_id)),
        }
    }

    /// Lead scope for organizer-only operations
    pub fn organizer_lead_scope(&self) -> Result<LeadScope, AuthzError> {
        self.require_organizer().map(LeadScope::organization)
    }
}

/// Row filter over leads
///
/// Applied in SQL as
/// `organization_id = $1 AND ($2::uuid IS NULL OR agent_id = $2)`
/// with [`organization_id`](Self::organization_id) and
/// [`agent_id`](Self::agent_id) bound in that order. [`admits`](Self::admits)
/// evaluates the same predicate in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadScope {
    organization_id: Uuid,
    agent_id: Option<Uuid>,
}

impl LeadScope {
    /// SQL predicate; binds `$1` and `$2`
    pub const SQL_PREDICATE: &'static str =
        "organization_id = $1 AND ($2::uuid IS NULL OR agent_id = $2)";

    /// Every lead of an organization
    pub fn organization(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            agent_id: None,
        }
    }

    /// Leads of an organization assigned to one agent
    pub fn assigned_to(organization_id: Uuid, agent_id: Uuid) -> Self {
        Self {
            organization_id,
            agent_id: Some(agent_id),
        }
    }

    pub fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    /// Agent restriction, `None` for organizer scopes
    pub fn agent_id(&self) -> Option<Uuid> {
        self.agent_id
    }

    /// In-memory form of [`SQL_PREDICATE`](Self::SQL_PREDICATE)
    pub fn admits(&self, organization_id: Uuid, agent_id: Option<Uuid>) -> bool {
        if organization_id != self.organization_id {
            return false;
        }

        match self.agent_id {
            None => true,
            Some(required) => agent_id == Some(required),
        }
    }
}

/// Split of an organizer's lead list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignmentFilter {
    #[default]
    Any,

    /// Agent set
    Assigned,

    /// Agent null
    Unassigned,
}

impl AssignmentFilter {
    /// Value bound to `($n::boolean IS NULL OR (agent_id IS NOT NULL) = $n)`
    pub fn as_sql_flag(&self) -> Option<bool> {
        match self {
            AssignmentFilter::Any => None,
            AssignmentFilter::Assigned => Some(true),
            AssignmentFilter::Unassigned => Some(false),
        }
    }

    pub fn matches(&self, agent_id: Option<Uuid>) -> bool {
        match self.as_sql_flag() {
            None => true,
            Some(assigned) => agent_id.is_some() == assigned,
        }
    }
}
