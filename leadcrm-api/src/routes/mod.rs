/// API route handlers, one module per resource
///
/// - `health`: Health check endpoint
/// - `auth`: Signup, login and token refresh
/// - `leads`: Leads, their assignment and category
/// - `categories`: Lead categories
/// - `agents`: Agent management and invitation

pub mod agents;
pub mod auth;
pub mod categories;
pub mod health;
pub mod leads;
