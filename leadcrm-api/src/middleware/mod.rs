/// Middleware for the API server
///
/// - `security`: security response headers
/// - `auth`: bearer authentication and actor resolution

pub mod auth;
pub mod security;
