use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core services: credentials, the access guard and content integrity.
pub mod accounts;
pub mod auth;
pub mod credentials;
pub mod integrity;

// Boundaries and shared plumbing.
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod session;
pub mod storage;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use credentials::CredentialService;
pub use error::{AppError, AppResult};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for every handler annotated with `#[utoipa::path]`.
/// Served at `/api-docs/openapi.json`, browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login, handlers::logout, handlers::login_page,
        handlers::list_posts, handlers::get_post, handlers::get_author_posts,
        handlers::list_categories, handlers::get_category_posts,
        handlers::get_me, handlers::update_me, handlers::get_dashboard, handlers::new_post_form,
        handlers::create_post, handlers::update_post, handlers::delete_post,
        handlers::get_presigned_url,
        handlers::admin_list_accounts, handlers::admin_update_account,
        handlers::admin_delete_account, handlers::admin_list_posts,
        handlers::admin_list_categories, handlers::admin_create_category,
        handlers::admin_toggle_category, handlers::get_admin_stats
    ),
    components(
        schemas(
            models::Role, models::Account, models::Post, models::Category,
            models::RegisterRequest, models::LoginRequest, models::UpdateMeRequest,
            models::AdminUpdateAccountRequest, models::CreatePostRequest,
            models::UpdatePostRequest, models::CreateCategoryRequest,
            models::PresignedUrlRequest, models::PresignedUrlResponse,
            models::SessionResponse, models::HomeView, models::AuthorPostsView,
            models::DashboardView, models::PostFormView, models::LoginView,
            models::AccountDeletedResponse, models::AdminDashboardStats,
        )
    ),
    tags(
        (name = "inkwell", description = "Inkwell blogging API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared state container. Everything in it is either immutable
/// (`AppConfig`, the credential keys) or an `Arc` to a thread-safe service.
#[derive(Clone)]
pub struct AppState {
    /// Document store (Postgres in deployments, in-memory in tests).
    pub repo: RepositoryState,
    /// Image upload intake (S3/MinIO).
    pub storage: StorageState,
    pub config: AppConfig,
    /// Password hashing and session claim signing.
    pub credentials: CredentialService,
}

// --- Axum FromRef Extractor Implementations ---

// Lets extractors such as `AuthUser` pull just the slices they need.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for CredentialService {
    fn from_ref(app_state: &AppState) -> CredentialService {
        app_state.credentials.clone()
    }
}

/// auth_middleware
///
/// Guards `authenticated_routes`. Extracting `AuthUser` verifies the session
/// claim and re-reads the account; on failure the extractor rejects with a
/// redirect to the login entry point and the handler never runs.
async fn auth_middleware(
    _auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Response {
    next.run(request).await
}

/// create_router
///
/// Builds the full application: documentation, the three access-level routers,
/// shared state, and the correlation/tracing/CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // Every authenticated route sits behind the session check.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin handlers take `AdminUser`, which authenticates and then checks the stored role.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    app.layer(
        ServiceBuilder::new()
            // Tag every request with a UUID so its log lines can be correlated.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // Echo the id back to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
    .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer` carrying method, URI and the request id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
