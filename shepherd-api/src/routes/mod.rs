/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Sign-in, token refresh, sign-out and password recovery
/// - `users`: The caller's profile, creatable roles and leader provisioning
/// - `nodes`: Summaries, breakdowns and growth reports for tree nodes
/// - `alerts`: Alert feed and broadcasting

pub mod alerts;
pub mod auth;
pub mod health;
pub mod nodes;
pub mod users;
