//! Authentication: JWT sessions, role checks, and middleware

mod context;
mod jwt;
mod manager;
mod middleware;

pub use context::{AuthContext, Role};
pub use jwt::{JwtError, SessionClaims};
pub use manager::AuthManager;
pub use middleware::{Auth, AuthError, AuthState, require_auth};
