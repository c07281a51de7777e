//! API route definitions

use crate::auth::middleware::require_session;
use crate::handlers::{images, posts, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Routes under `/api`
///
/// `/users/*` is public. Everything else passes the access guard.
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public_routes = Router::new()
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login));

    // `/posts/:title` (GET) and `/posts/:id` (DELETE) share one segment
    let protected_routes = Router::new()
        .route(
            "/posts",
            get(posts::list_posts)
                .post(posts::create_post)
                .put(posts::update_post),
        )
        .route(
            "/posts/:param",
            get(posts::list_posts_by_title).delete(posts::delete_post),
        )
        .route("/images", post(images::upload_image))
        .route_layer(middleware::from_fn_with_state(state, require_session));

    Router::new().merge(public_routes).merge(protected_routes)
}
