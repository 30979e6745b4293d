//! Bearer-token authentication

mod jwt;
mod middleware;

pub use jwt::{Claims, CurrentUser, JwtError, JwtService};
pub use middleware::{require_admin, require_auth};
