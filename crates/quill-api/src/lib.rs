//! Quill API - REST server for a small blog
//!
//! Users register and log in with an email and password. Login issues a
//! short-lived JWT, returned in the body and mirrored in a cookie; post and
//! image routes require both copies to match.

pub mod audit;
pub mod auth;
pub mod compress;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use handlers::health;
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Quill API",
        description = "Blog posts, users and image uploads"
    ),
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::users::register,
        handlers::users::login,
        handlers::posts::list_posts,
        handlers::posts::list_posts_by_title,
        handlers::posts::create_post,
        handlers::posts::update_post,
        handlers::posts::delete_post,
        handlers::images::upload_image,
    ),
    components(schemas(
        quill_core::Post,
        quill_core::UserProfile,
        quill_core::ImageRecord,
        auth::Credentials,
        auth::Claims,
        auth::LoginResponse,
        error::ApiError,
        error::PostEnvelope,
        error::PostListEnvelope,
        error::UserEnvelope,
        error::ImageEnvelope,
        handlers::posts::CreatePostForm,
        handlers::posts::UpdatePostForm,
        handlers::images::ImageUpload,
        health::HealthResponse,
        health::ReadinessResponse,
    )),
    modifiers(&SessionSecurity),
    tags(
        (name = "users", description = "Registration and login"),
        (name = "posts", description = "Blog posts"),
        (name = "images", description = "Image upload"),
        (name = "health", description = "Probes"),
    )
)]
pub struct ApiDoc;

/// Bearer scheme; the same token must also be sent in the session cookie
struct SessionSecurity;

impl Modify for SessionSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_cookie",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Must equal the `token` cookie"))
                        .build(),
                ),
            );
        }
    }
}

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = routes::api_routes(state.clone()).layer(axum::middleware::from_fn(
        middleware::security_headers_middleware,
    ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api", api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(state.config.server.max_body_size))
        .layer(middleware::cors_layer(&state.config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Fixtures for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use crate::auth::PasswordConfig;
    use crate::state::AppState;
    use quill_core::{AppConfig, MemoryStore};
    use std::sync::Arc;

    /// Signing secret used by [`test_state`]
    pub const TEST_JWT_SECRET: &str = "quill-test-secret";

    /// State over a fresh in-memory store with cheap password hashing
    pub fn test_state() -> Arc<AppState> {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = TEST_JWT_SECRET.to_string();

        let state = AppState::new(config, Arc::new(MemoryStore::new()))
            .with_password_config(PasswordConfig::fast_insecure());
        Arc::new(state)
    }
}

/// Router over [`testing::test_state`]
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_router(testing::test_state())
}
