use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Moderation and oversight, nested under `/admin`.
///
/// Access Control:
/// Every handler takes the `AdminUser` extractor, which authenticates the caller
/// and then checks the role *stored* on the account. An anonymous caller is
/// redirected to the login entry point; a signed-in non-admin gets 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        .route("/stats", get(handlers::get_admin_stats))
        // GET /admin/accounts
        // Non-admin accounts only.
        .route("/accounts", get(handlers::admin_list_accounts))
        // PUT /admin/accounts/{id} edits username, email and age.
        // DELETE /admin/accounts/{id} removes the account and all of its posts.
        .route(
            "/accounts/{id}",
            put(handlers::admin_update_account).delete(handlers::admin_delete_account),
        )
        .route("/posts", get(handlers::admin_list_posts))
        .route(
            "/categories",
            get(handlers::admin_list_categories).post(handlers::admin_create_category),
        )
        // POST /admin/categories/{id}/toggle
        // Flips is_active. Inactive categories vanish from public listings.
        .route("/categories/{id}/toggle", post(handlers::admin_toggle_category))
}
