use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Everything a signed-in author does. The router is wrapped in the `AuthUser`
/// middleware in `create_router`; handlers additionally take `AuthUser` to get
/// the resolved account for ownership checks.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET/PUT /me
        // Read or edit the caller's own account. PUT re-issues the session cookie.
        .route("/me", get(handlers::get_me).put(handlers::update_me))
        // GET /dashboard
        // The caller's identity and own posts.
        .route("/dashboard", get(handlers::get_dashboard))
        // GET /posts/new
        // Active categories for the authoring form.
        .route("/posts/new", get(handlers::new_post_form))
        // POST /posts
        // Publishes a post under a unique slug.
        .route("/posts", post(handlers::create_post))
        // PUT/DELETE /posts/{id}
        // Owner or admin only, checked in the integrity manager.
        .route(
            "/posts/{id}",
            put(handlers::update_post).delete(handlers::delete_post),
        )
        // POST /upload/presigned
        // Short-lived image upload URL plus the object key to store on the post.
        .route("/upload/presigned", post(handlers::get_presigned_url))
}
