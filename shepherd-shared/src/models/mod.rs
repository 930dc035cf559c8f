/// Entity records for Shepherd
///
/// Every record here is a plain value with a set of async CRUD helpers for
/// PostgreSQL. Business rules live elsewhere: records are read in bulk into a
/// [`Snapshot`](crate::snapshot::Snapshot) and only ever change through the
/// entity store gateway.
///
/// # Models
///
/// - `node`: Node kinds and references into the organization tree
/// - `role`: Leadership roles and the tagged scope assignment
/// - `user`: User profiles
/// - `zone`, `area`, `cell`: The three levels of the organization
/// - `member`: Cell members
/// - `meeting`: Cell meetings with attendance and offerings
/// - `alert`: Broadcast alerts and their audience
///
/// # Example
///
/// ```no_run
/// use shepherd_shared::db::pool::{create_pool, DatabaseConfig};
/// use shepherd_shared::models::zone::Zone;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let zones = Zone::list(&pool).await?;
/// # Ok(())
/// # }
/// ```

pub mod alert;
pub mod area;
pub mod cell;
pub mod meeting;
pub mod member;
pub mod node;
pub mod role;
pub mod user;
pub mod zone;
