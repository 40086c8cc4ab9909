use crate::{
    AppState, accounts,
    auth::{AdminUser, AuthUser},
    credentials::CredentialService,
    error::{AppError, AppResult},
    integrity,
    models::{
        Account, AccountDeletedResponse, AdminDashboardStats, AdminUpdateAccountRequest,
        AuthorPostsView, Category, CreateCategoryRequest, CreatePostRequest, DashboardView,
        HomeView, LoginRequest, LoginView, NewCategory, Post, PostFormView, PresignedUrlRequest,
        PresignedUrlResponse, RegisterRequest, Role, SessionResponse, UpdateMeRequest,
        UpdatePostRequest,
    },
    repository::{PostFilter, Repository},
    session::{clear_session_cookie, session_cookie},
    storage::image_object_key,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderName, StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// CategoryFilter
///
/// Optional category for the home listing (GET /posts?category=...).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct CategoryFilter {
    pub category: Option<String>,
}

/// Status, session cookie and account body returned by the sign-in handlers.
type SessionReply = (StatusCode, [(HeaderName, String); 1], Json<SessionResponse>);

/// Attaches a fresh session cookie for `account` to a JSON body.
fn with_session(
    credentials: &CredentialService,
    status: StatusCode,
    account: Account,
) -> AppResult<SessionReply> {
    let token = credentials.issue_claim(&account)?;
    let cookie = session_cookie(&token, credentials.session_ttl().num_seconds());
    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse { account }),
    ))
}

async fn home_view(repo: &dyn Repository, category: Option<String>) -> AppResult<HomeView> {
    let category = category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let filter = match &category {
        Some(name) => PostFilter::by_category(name.clone()),
        None => PostFilter::default(),
    };

    let posts = repo.list_posts(filter).await?;
    let categories = repo
        .list_categories(true)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();

    Ok(HomeView {
        posts,
        categories,
        selected_category: category.unwrap_or_default(),
    })
}

// --- Session Handlers ---

/// register
///
/// [Public Route] Creates an ordinary user account and signs it in.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = SessionResponse),
        (status = 400, description = "Missing field or weak password"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<SessionReply> {
    let account = accounts::register(state.repo.as_ref(), &state.credentials, payload).await?;
    with_session(&state.credentials, StatusCode::CREATED, account)
}

/// login
///
/// [Public Route] Exchanges email and password for a session cookie.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<SessionReply> {
    let account = accounts::login(state.repo.as_ref(), &state.credentials, payload).await?;
    tracing::info!(account = %account.email, "Signed in");
    with_session(&state.credentials, StatusCode::OK, account)
}

/// logout
///
/// [Public Route] Clears the session cookie. Always succeeds.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 204, description = "Signed out"))
)]
pub async fn logout() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_session_cookie())],
    )
}

/// login_page
///
/// [Public Route] The login entry point that authentication redirects land on.
#[utoipa::path(
    get,
    path = "/login",
    responses((status = 200, description = "Login entry point", body = LoginView))
)]
pub async fn login_page() -> Json<LoginView> {
    Json(LoginView {
        message: "Sign in with your email and password".to_string(),
    })
}

// --- Public Read Handlers ---

/// list_posts
///
/// [Public Route] Home listing, newest first, optionally narrowed to one category.
#[utoipa::path(
    get,
    path = "/posts",
    params(CategoryFilter),
    responses((status = 200, description = "Home listing", body = HomeView))
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(filter): Query<CategoryFilter>,
) -> AppResult<Json<HomeView>> {
    Ok(Json(home_view(state.repo.as_ref(), filter.category).await?))
}

/// get_post
#[utoipa::path(
    get,
    path = "/post/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<Post>> {
    state
        .repo
        .find_post_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Post"))
}

/// get_author_posts
///
/// [Public Route] Every post published under an author name.
#[utoipa::path(
    get,
    path = "/authors/{author_name}/posts",
    params(("author_name" = String, Path, description = "Author display name")),
    responses((status = 200, description = "Author posts", body = AuthorPostsView))
)]
pub async fn get_author_posts(
    State(state): State<AppState>,
    Path(author_name): Path<String>,
) -> AppResult<Json<AuthorPostsView>> {
    let posts = state
        .repo
        .list_posts(PostFilter::by_author_name(author_name.clone()))
        .await?;
    Ok(Json(AuthorPostsView { author_name, posts }))
}

/// list_categories
///
/// [Public Route] Active categories, sorted by name.
#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "Active categories", body = [Category]))
)]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.repo.list_categories(true).await?))
}

/// get_category_posts
#[utoipa::path(
    get,
    path = "/categories/{name}/posts",
    params(("name" = String, Path, description = "Category name")),
    responses((status = 200, description = "Category listing", body = HomeView))
)]
pub async fn get_category_posts(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<HomeView>> {
    Ok(Json(home_view(state.repo.as_ref(), Some(name)).await?))
}

// --- Authenticated Handlers ---

/// get_me
///
/// [Authenticated Route] The signed-in account, as currently stored.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Current account", body = Account))
)]
pub async fn get_me(AuthUser(account): AuthUser) -> Json<Account> {
    Json(account)
}

/// update_me
///
/// [Authenticated Route] Self edit. The session cookie is re-issued so the
/// claim carries the new identity.
#[utoipa::path(
    put,
    path = "/me",
    request_body = UpdateMeRequest,
    responses(
        (status = 200, description = "Updated", body = SessionResponse),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn update_me(
    AuthUser(account): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateMeRequest>,
) -> AppResult<SessionReply> {
    let updated =
        accounts::update_own_account(state.repo.as_ref(), &state.credentials, &account, payload)
            .await?;
    with_session(&state.credentials, StatusCode::OK, updated)
}

/// get_dashboard
///
/// [Authenticated Route] Identity plus the caller's own posts.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "Dashboard", body = DashboardView))
)]
pub async fn get_dashboard(
    AuthUser(account): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DashboardView>> {
    let posts = state
        .repo
        .list_posts(PostFilter::by_author_email(account.email.clone()))
        .await?;
    Ok(Json(DashboardView { account, posts }))
}

/// new_post_form
#[utoipa::path(
    get,
    path = "/posts/new",
    responses((status = 200, description = "Authoring options", body = PostFormView))
)]
pub async fn new_post_form(
    AuthUser(_caller): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<PostFormView>> {
    let categories = state.repo.list_categories(true).await?;
    Ok(Json(PostFormView { categories }))
}

/// create_post
///
/// [Authenticated Route] Publishes a post authored by the caller. The slug is
/// derived from the explicit slug or the title and made unique.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 404, description = "Unknown or inactive category")
    )
)]
pub async fn create_post(
    AuthUser(account): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> AppResult<(StatusCode, Json<Post>)> {
    let post = integrity::create_post(state.repo.as_ref(), &account, payload).await?;
    tracing::info!(post = %post.slug, author = %account.email, "Post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Authenticated Route] Owner or admin only.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    AuthUser(account): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> AppResult<Json<Post>> {
    Ok(Json(
        integrity::update_post(state.repo.as_ref(), &account, id, payload).await?,
    ))
}

/// delete_post
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    AuthUser(account): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    integrity::delete_post(state.repo.as_ref(), &account, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// get_presigned_url
///
/// [Authenticated Route] Issues a short-lived upload URL for a post or category
/// image. The returned `resource_key` is what gets stored in the `image` field.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL Generated", body = PresignedUrlResponse),
        (status = 400, description = "Not an image type")
    )
)]
pub async fn get_presigned_url(
    AuthUser(account): AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> AppResult<Json<PresignedUrlResponse>> {
    let key = image_object_key(&payload.filename);
    let upload_url = state
        .storage
        .get_presigned_upload_url(&key, &payload.file_type)
        .await?;

    tracing::debug!(key = %key, by = %account.email, "Presigned upload issued");
    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key: key,
    }))
}

// --- Admin Handlers ---

/// admin_list_accounts
///
/// [Admin Route] Every non-admin account.
#[utoipa::path(
    get,
    path = "/admin/accounts",
    responses(
        (status = 200, description = "Accounts", body = [Account]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn admin_list_accounts(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Account>>> {
    Ok(Json(state.repo.list_accounts(Some(Role::User)).await?))
}

/// admin_update_account
#[utoipa::path(
    put,
    path = "/admin/accounts/{id}",
    request_body = AdminUpdateAccountRequest,
    responses(
        (status = 200, description = "Updated", body = Account),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn admin_update_account(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminUpdateAccountRequest>,
) -> AppResult<Json<Account>> {
    Ok(Json(
        accounts::admin_update_account(state.repo.as_ref(), id, payload).await?,
    ))
}

/// admin_delete_account
///
/// [Admin Route] Removes an account together with all of its posts.
#[utoipa::path(
    delete,
    path = "/admin/accounts/{id}",
    responses(
        (status = 200, description = "Deleted", body = AccountDeletedResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn admin_delete_account(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AccountDeletedResponse>> {
    let posts_removed = integrity::cascade_delete_account(state.repo.as_ref(), id).await?;
    tracing::info!(account_id = %id, by = %admin.email, "Account removed by admin");
    Ok(Json(AccountDeletedResponse {
        account_id: id,
        posts_removed,
    }))
}

/// admin_list_posts
#[utoipa::path(
    get,
    path = "/admin/posts",
    responses((status = 200, description = "All posts", body = [Post]))
)]
pub async fn admin_list_posts(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Post>>> {
    Ok(Json(state.repo.list_posts(PostFilter::default()).await?))
}

/// admin_list_categories
///
/// [Admin Route] Active and inactive categories.
#[utoipa::path(
    get,
    path = "/admin/categories",
    responses((status = 200, description = "All categories", body = [Category]))
)]
pub async fn admin_list_categories(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.repo.list_categories(false).await?))
}

/// admin_create_category
#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn admin_create_category(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("category name is required".to_string()));
    }
    let image = payload.image.trim().to_string();
    if image.is_empty() {
        return Err(AppError::BadRequest("category image is required".to_string()));
    }

    let category = state
        .repo
        .create_category(NewCategory { name, image })
        .await?;
    tracing::info!(category = %category.name, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// admin_toggle_category
///
/// [Admin Route] Flips a category between active and inactive. Inactive
/// categories disappear from listings and cannot be assigned to posts.
#[utoipa::path(
    post,
    path = "/admin/categories/{id}/toggle",
    responses(
        (status = 200, description = "Toggled", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn admin_toggle_category(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Category>> {
    state
        .repo
        .toggle_category(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Category"))
}

/// get_admin_stats
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Stats", body = AdminDashboardStats))
)]
pub async fn get_admin_stats(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<AdminDashboardStats>> {
    Ok(Json(state.repo.get_stats().await?))
}
