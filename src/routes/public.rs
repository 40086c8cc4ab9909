use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: health, the login entry point,
/// registration and the read-only post and category listings.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Load balancer probe.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Creates a user account and returns it with a session cookie.
        .route("/register", post(handlers::register))
        // GET /login is where unauthenticated redirects land; POST /login signs in.
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", post(handlers::logout))
        // GET /posts?category=...
        // Home listing, newest first, with the active category names.
        .route("/posts", get(handlers::list_posts))
        .route("/post/{slug}", get(handlers::get_post))
        .route("/authors/{author_name}/posts", get(handlers::get_author_posts))
        // Only active categories are visible here.
        .route("/categories", get(handlers::list_categories))
        .route("/categories/{name}/posts", get(handlers::get_category_posts))
}
