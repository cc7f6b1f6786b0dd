/// Database models for LeadCRM
///
/// # Models
///
/// - `user`: User accounts with their role
/// - `user_profile`: Organization profile, one per user
/// - `agent`: Agents working for an organization
/// - `category`: Lead categories of an organization
/// - `lead`: Leads, queried through a [`LeadScope`](crate::auth::authorization::LeadScope)
///
/// # Example
///
/// ```no_run
/// use leadcrm_shared::models::user::{CreateUser, User, UserRole};
/// use leadcrm_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let (organizer, organization) = User::create(&pool, CreateUser {
///     username: "acme".to_string(),
///     email: "owner@acme.test".to_string(),
///     first_name: "Ada".to_string(),
///     last_name: "Owner".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: UserRole::Organizer,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod agent;
pub mod category;
pub mod lead;
pub mod user;
pub mod user_profile;
