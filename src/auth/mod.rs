//! Credentials and bearer tokens.
//!
//! Passwords are stored as Argon2id PHC strings with a per-record random
//! salt. Tokens are HS256 JWTs carrying the user id; they hold no
//! server-side session state.

pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::{require_auth, AuthUser};
pub use password::{hash_password, verify_password, PasswordError};
pub use token::{Claims, TokenError, TokenService};
