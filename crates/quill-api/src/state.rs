//! Application state management

use crate::auth::{AuthService, JwtConfig, PasswordConfig};
use quill_core::{AppConfig, Store};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
///
/// Holds configuration, the store handle and the authentication service;
/// there is no per-session state on the server.
pub struct AppState {
    /// Validated application configuration
    pub config: AppConfig,
    /// Token signing settings derived from `config.auth`
    pub jwt_config: JwtConfig,
    /// Persistence backend
    pub store: Arc<dyn Store>,
    auth: AuthService,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state with config and store
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let jwt_config = JwtConfig::from(&config.auth);
        let auth = AuthService::new(store.clone(), jwt_config.clone(), PasswordConfig::default());
        Self {
            config,
            jwt_config,
            store,
            auth,
            start_time: Instant::now(),
        }
    }

    /// Override the Argon2 parameters
    pub fn with_password_config(mut self, password_config: PasswordConfig) -> Self {
        self.auth = AuthService::new(self.store.clone(), self.jwt_config.clone(), password_config);
        self
    }

    /// Authentication service over this state's store and settings
    ///
    /// Shared across requests, so the unknown-user hash is built once.
    pub fn auth_service(&self) -> &AuthService {
        &self.auth
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
