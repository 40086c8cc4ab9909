use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The RBAC flag carried by every account. Stored as lower-case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(value)),
        }
    }
}

/// Account
///
/// Identity, credential and role, as stored in the `accounts` table.
/// The password hash is never serialized into a response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    // Unique across all accounts (enforced by a storage index).
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    #[schema(ignore)]
    pub password_hash: String,
    pub age: i32,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Post
///
/// Authored content from the `posts` table. `author_name` is a snapshot of the
/// author's username at creation and is not kept in sync afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    // Globally unique, URL-safe.
    pub slug: String,
    pub description: String,
    // Storage key or URL; empty when the post has no image.
    pub image: String,
    // Name of a Category.
    pub category: String,
    pub author_email: String,
    pub author_name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Category
///
/// A named, togglable content bucket. Only active categories are offered to
/// readers and authors.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Storage Inputs ---

/// NewAccount
///
/// Everything the store needs to insert an account. The id is store-assigned.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub age: i32,
    pub role: Role,
}

/// AccountChanges
///
/// Fields an account edit may touch. Role is deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub username: String,
    pub email: String,
    pub age: i32,
    pub password_hash: Option<String>,
}

/// NewPost
///
/// A post ready for insertion, with its slug already reserved.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub image: String,
    pub category: String,
    pub author_email: String,
    pub author_name: String,
}

/// PostChanges
///
/// Resolved post edit. `None` keeps the stored value.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub image: Option<String>,
    pub category: Option<String>,
}

/// NewCategory
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub image: String,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for the public registration endpoint (POST /register).
/// The password is hashed immediately and never logged or persisted in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub age: i32,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// UpdateMeRequest
///
/// Self edit (PUT /me). An empty or missing password leaves the stored hash alone.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateMeRequest {
    pub username: String,
    pub email: String,
    pub age: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// AdminUpdateAccountRequest
///
/// Admin edit (PUT /admin/accounts/{id}). Neither role nor password can be changed here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminUpdateAccountRequest {
    pub username: String,
    pub email: String,
    pub age: i32,
}

/// CreatePostRequest
///
/// Input payload for POST /posts. When `slug` is absent the title is slugified.
/// `image_key` is the object key returned by the presigned upload flow.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub description: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
}

/// UpdatePostRequest
///
/// Input payload for PUT /posts/{id}. Title and description are always resubmitted
/// (as the edit form does); image and category are optional.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
}

/// CreateCategoryRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub image: String,
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived S3 upload URL (POST /upload/presigned).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "cover.png")]
    pub filename: String,
    /// The MIME type the upload is constrained to.
    #[schema(example = "image/png")]
    pub file_type: String,
}

/// PresignedUrlResponse
///
/// The temporary upload URL plus the object key to store on a post or category.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    pub upload_url: String,
    pub resource_key: String,
}

// --- Data Bags (Output Schemas) ---

/// SessionResponse
///
/// Returned by register/login/self-edit alongside the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SessionResponse {
    pub account: Account,
}

/// HomeView
///
/// Data for the home and category listings: posts newest first plus the
/// names of active categories for the filter bar.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct HomeView {
    pub posts: Vec<Post>,
    pub categories: Vec<String>,
    pub selected_category: String,
}

/// AuthorPostsView
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthorPostsView {
    pub author_name: String,
    pub posts: Vec<Post>,
}

/// DashboardView
///
/// The signed-in account and its own posts.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardView {
    pub account: Account,
    pub posts: Vec<Post>,
}

/// PostFormView
///
/// Options for the post authoring form: only active categories are offered.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostFormView {
    pub categories: Vec<Category>,
}

/// LoginView
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginView {
    pub message: String,
}

/// AccountDeletedResponse
///
/// Outcome of the admin cascade delete.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AccountDeletedResponse {
    pub account_id: Uuid,
    pub posts_removed: u64,
}

/// AdminDashboardStats
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_accounts: i64,
    pub total_posts: i64,
    pub total_categories: i64,
    pub active_categories: i64,
}
