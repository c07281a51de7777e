//! Security audit logging for authentication events
//!
//! Registration, login and access-guard outcomes are logged at INFO level
//! with the "audit" target so they can be filtered and routed separately
//! from application logs.
//!
//! Guard rejections carry their internal reason here and nowhere else: the
//! client only ever sees a bare 401.
//!
//! # Example
//!
//! ```ignore
//! use quill_api::audit::{audit_log, AuditEvent};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     username: "a@example.com".to_string(),
//!     ip_address: Some("192.168.1.1".to_string()),
//!     user_agent: None,
//! });
//! ```

use axum::http::{header, HeaderMap};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful user registration
    RegistrationSuccess {
        user_id: i32,
        username: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed registration attempt
    RegistrationFailure {
        username: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Successful user login
    LoginSuccess {
        username: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login attempt
    LoginFailure {
        username: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Access guard rejected a request
    AccessDenied {
        path: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },
}

impl AuditEvent {
    /// Who the event is about: a username, or the path for guard rejections
    pub fn subject(&self) -> &str {
        match self {
            AuditEvent::RegistrationSuccess { username, .. }
            | AuditEvent::RegistrationFailure { username, .. }
            | AuditEvent::LoginSuccess { username, .. }
            | AuditEvent::LoginFailure { username, .. } => username,
            AuditEvent::AccessDenied { path, .. } => path,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            AuditEvent::RegistrationFailure { reason, .. }
            | AuditEvent::LoginFailure { reason, .. }
            | AuditEvent::AccessDenied { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn ip_address(&self) -> Option<&str> {
        match self {
            AuditEvent::RegistrationSuccess { ip_address, .. }
            | AuditEvent::RegistrationFailure { ip_address, .. }
            | AuditEvent::LoginSuccess { ip_address, .. }
            | AuditEvent::LoginFailure { ip_address, .. }
            | AuditEvent::AccessDenied { ip_address, .. } => ip_address.as_deref(),
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::RegistrationSuccess { .. } => "Registration successful",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::AccessDenied { .. } => "Access denied",
        }
    }
}

/// Emit `event` on the `audit` target
///
/// The full event is attached as JSON alongside flat fields for filtering.
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"unserializable audit event: {e}\"}}"));

    info!(
        target: "audit",
        timestamp = %Utc::now(),
        event = %event_json,
        subject = event.subject(),
        reason = event.reason(),
        ip_address = event.ip_address(),
        "{}",
        event.summary()
    );
}

/// Client details attached to audit events
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Client address as reported by a reverse proxy
///
/// The first hop of `X-Forwarded-For` wins over `X-Real-IP`. Without a proxy
/// in front, neither is present and this is `None`.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|chain| chain.split(',').next())
        .or_else(|| header_str(headers, "x-real-ip"))
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    header_str(headers, header::USER_AGENT.as_str()).map(str::to_string)
}
