/// Database layer for Shepherd
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health check and stats
/// - `migrations`: Embedded schema migrations
///
/// Queries for each entity live next to the record in `models`.

pub mod migrations;
pub mod pool;
