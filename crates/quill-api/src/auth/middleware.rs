//! Access guard middleware for protecting routes
//!
//! Reads the bearer token from the Authorization header and its mirror from
//! the session cookie, then runs [`check_access`]. Every rejection gets the
//! same bare 401; the reason only goes to the audit log.

use super::guard::{check_access, AccessDecision};
use super::jwt::unix_now;
use crate::audit::{audit_log, AuditContext, AuditEvent};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identity of an admitted request
///
/// Inserted into request extensions; extract with
/// `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub username: String,
}

/// Bearer credential from the Authorization header, if well formed
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Access guard middleware
///
/// # Usage
///
/// ```ignore
/// use axum::{middleware, routing::post, Router};
/// use quill_api::auth::middleware::require_session;
///
/// let protected = Router::new()
///     .route("/posts", post(create_post))
///     .route_layer(middleware::from_fn_with_state(state.clone(), require_session));
/// ```
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let now = unix_now().map_err(|e| AppError::Internal(e.to_string()))?;

    let bearer = bearer_token(request.headers());
    let cookie = jar.get(&state.config.auth.cookie_name).map(|c| c.value());

    match check_access(&state.jwt_config, bearer, cookie, now) {
        AccessDecision::Admitted(claims) => {
            request.extensions_mut().insert(AuthenticatedUser {
                username: claims.username,
            });
            Ok(next.run(request).await)
        }
        AccessDecision::Rejected(reason) => {
            let ctx = AuditContext::from_headers(request.headers());
            audit_log(&AuditEvent::AccessDenied {
                path: request.uri().path().to_string(),
                reason: reason.to_string(),
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            });
            Err(AppError::Unauthorized)
        }
    }
}
