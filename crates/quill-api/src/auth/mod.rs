//! Authentication and authorization module
//!
//! - Token issuing and verification (HS256 JWT)
//! - Password hashing with Argon2 and the password policy
//! - The access guard decision and its middleware
//! - Registration and login service

pub mod guard;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use guard::{check_access, AccessDecision, Rejection};
pub use jwt::{decode_token, generate_token, generate_token_at, Claims, JwtConfig, JwtError};
pub use middleware::{require_session, AuthenticatedUser};
pub use password::{check_password_policy, hash_password, verify_password, PasswordConfig};
pub use service::{AuthService, Credentials, LoginResponse};
