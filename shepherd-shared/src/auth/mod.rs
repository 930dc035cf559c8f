/// Authentication and authorization
///
/// # Modules
///
/// - [`authorization`]: The role-scoped policy: who can view, create and manage what
/// - [`jwt`]: HS256 access, refresh and recovery tokens
/// - [`password`]: Argon2id hashing, strength rules and temporary passwords
/// - [`middleware`]: Axum bearer token layer producing an `AuthContext`
///
/// # Example
///
/// ```
/// use shepherd_shared::auth::authorization::allowed_roles;
/// use shepherd_shared::models::role::Role;
///
/// assert_eq!(allowed_roles(Role::AreaLeader), &[Role::CellLeader]);
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
