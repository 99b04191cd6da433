pub mod api_key;
pub mod middleware;
pub mod rate_limit;

pub use middleware::{auth_middleware, require_admin, AuthUser};
