//! Registration and login handlers
//!
//! Both take a urlencoded form with `username` and `password`. Login hands
//! the token back twice: in the body and in the session cookie.

use crate::audit::{audit_log, AuditContext, AuditEvent};
use crate::auth::{Credentials, LoginResponse};
use crate::error::{AppError, Envelope, UserEnvelope};
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, Form, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::WithRejection;
use quill_core::{AuthConfig, UserProfile};
use std::sync::Arc;

/// Session cookie carrying a copy of the token
///
/// Not `HttpOnly`: clients read it back to build the bearer header.
pub fn session_cookie(auth: &AuthConfig, token: String) -> Cookie<'static> {
    let max_age = i64::try_from(auth.token_ttl_secs).unwrap_or(i64::MAX);
    Cookie::build((auth.cookie_name.clone(), token))
        .path("/")
        .secure(auth.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

fn failure_reason(err: &AppError) -> String {
    match err {
        AppError::Validation(msg) => msg.clone(),
        AppError::DuplicateUser => "duplicate username".to_string(),
        AppError::Authentication => "invalid credentials".to_string(),
        other => format!("{other:?}"),
    }
}

/// Register a new user
///
/// Responds with the stored profile; the password hash is never returned.
#[utoipa::path(
    post,
    path = "/api/users/register",
    tag = "users",
    request_body(content = Credentials, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "User created", body = UserEnvelope),
        (status = 400, description = "Invalid input or username taken", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    WithRejection(Form(request), _): WithRejection<Form<Credentials>, AppError>,
) -> Result<Json<Envelope<UserProfile>>, AppError> {
    let ctx = AuditContext::from_headers(&headers);
    let username = request.username.clone();

    match state.auth_service().register(request).await {
        Ok(profile) => {
            audit_log(&AuditEvent::RegistrationSuccess {
                user_id: profile.id,
                username: profile.username.clone(),
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            });
            Ok(Json(Envelope::ok("User created successfully", profile)))
        }
        Err(err) => {
            audit_log(&AuditEvent::RegistrationFailure {
                username,
                reason: failure_reason(&err),
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            });
            Err(err)
        }
    }
}

/// Log in and start a session
///
/// Sets the session cookie and returns `{payload, token}`.
#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "users",
    request_body(content = Credentials, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Login successful; token also set as cookie", body = LoginResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "User or password incorrect", body = crate::error::ApiError),
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    WithRejection(Form(request), _): WithRejection<Form<Credentials>, AppError>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let ctx = AuditContext::from_headers(&headers);
    let username = request.username.clone();

    match state.auth_service().login(request).await {
        Ok(response) => {
            audit_log(&AuditEvent::LoginSuccess {
                username,
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            });
            let cookie = session_cookie(&state.config.auth, response.token.clone());
            Ok((jar.add(cookie), Json(response)))
        }
        Err(err) => {
            audit_log(&AuditEvent::LoginFailure {
                username,
                reason: failure_reason(&err),
                ip_address: ctx.ip_address,
                user_agent: ctx.user_agent,
            });
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let auth = AuthConfig {
            jwt_secret: "s".to_string(),
            ..AuthConfig::default()
        };
        let cookie = session_cookie(&auth, "abc.def.ghi".to_string());

        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "abc.def.ghi");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(60)));
        assert_ne!(cookie.http_only(), Some(true));
    }

    #[test]
    fn test_session_cookie_insecure_when_configured() {
        let auth = AuthConfig {
            cookie_secure: false,
            ..AuthConfig::default()
        };
        assert_eq!(session_cookie(&auth, "t".into()).secure(), Some(false));
    }
}
