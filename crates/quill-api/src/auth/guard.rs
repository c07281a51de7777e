//! Access guard decision
//!
//! A pure function over the bearer token, the cookie-held copy and the
//! current time. Checks run cheapest first and stop at the first failure:
//!
//! 1. a bearer token is present
//! 2. the cookie holds a byte-identical copy
//! 3. the signature verifies against the server secret
//! 4. `exp` is present and strictly after `now`
//!
//! The [`Rejection`] reason is for audit logs only. Callers must answer every
//! rejection identically.

use super::jwt::{decode_token, Claims, JwtConfig};

/// The check that stopped a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingToken,
    CookieMismatch,
    BadSignature,
    Expired,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::MissingToken => "missing bearer token",
            Rejection::CookieMismatch => "bearer token does not match cookie",
            Rejection::BadSignature => "token signature invalid",
            Rejection::Expired => "token expired or without expiry",
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`check_access`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Admitted(Claims),
    Rejected(Rejection),
}

impl AccessDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AccessDecision::Admitted(_))
    }
}

/// Decide whether a request may reach a protected handler
///
/// A missing cookie counts as a mismatch.
pub fn check_access(
    config: &JwtConfig,
    bearer: Option<&str>,
    cookie: Option<&str>,
    now: u64,
) -> AccessDecision {
    let token = match bearer {
        Some(token) if !token.is_empty() => token,
        _ => return AccessDecision::Rejected(Rejection::MissingToken),
    };

    if cookie != Some(token) {
        return AccessDecision::Rejected(Rejection::CookieMismatch);
    }

    let claims = match decode_token(config, token) {
        Ok(claims) => claims,
        Err(_) => return AccessDecision::Rejected(Rejection::BadSignature),
    };

    if !claims.is_live_at(now) {
        return AccessDecision::Rejected(Rejection::Expired);
    }

    AccessDecision::Admitted(claims)
}
