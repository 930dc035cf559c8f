//! # Shepherd Shared Library
//!
//! The role-scoped authorization and aggregation core of the Shepherd church
//! administration system, used by the API server and any other front end.
//!
//! ## Module Organization
//!
//! - `models`: records of the organization tree and their database operations
//! - `snapshot` / `hierarchy`: the full record set and the lookup index built
//!   from it
//! - `auth`: authorization policy, JWT, password hashing, request middleware
//! - `aggregation`: counts, averages, offering sums, weekly growth, breakdowns
//! - `gateway`: entity store trait with PostgreSQL and in-memory stores
//! - `identity`: identity provider trait with hosted and local providers
//! - `provisioning`: creating leader accounts and linking them into the tree
//! - `session`: a signed-in leader's view of the organization
//! - `alerts`: alert audiences and broadcasting
//! - `db`: connection pool and migrations
//! - `testing`: snapshot builder for tests (behind the `testing` feature)

pub mod aggregation;
pub mod alerts;
pub mod auth;
pub mod db;
pub mod gateway;
pub mod hierarchy;
pub mod identity;
pub mod models;
pub mod provisioning;
pub mod session;
pub mod snapshot;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Current version of the Shepherd shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
