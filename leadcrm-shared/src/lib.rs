//! # LeadCRM Shared Library
//!
//! Domain model, persistence and access rules of LeadCRM, used by the API
//! server.
//!
//! ## Module Organization
//!
//! - `models`: Users, organization profiles, agents, categories and leads
//! - `auth`: Passwords, JWTs and the authorization scope resolver
//! - `db`: Connection pool and migrations
//! - `notify`: Email notifications

pub mod auth;
pub mod db;
pub mod models;
pub mod notify;

/// Current version of the LeadCRM shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
