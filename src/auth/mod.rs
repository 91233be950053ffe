//! Credential store helpers, token issuer and the auth interceptor.
pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::require_auth;
pub use password::{hash_password, verify_password};
pub use token::{Claims, Identity, IssuedRefresh, TokenIssuer, TokenKind};
