use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        Account, AccountChanges, AdminDashboardStats, Category, NewAccount, NewCategory, NewPost,
        Post, PostChanges, Role,
    },
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// RepoError
///
/// Failures surfaced by the document store. Uniqueness is decided here, by the
/// storage layer, not by any pre-check done by callers.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// A unique index rejected the write. Carries the field name.
    #[error("{0} already in use")]
    Conflict(&'static str),

    /// A write referenced a parent record that does not exist.
    #[error("{0} does not exist")]
    MissingReference(&'static str),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Conflict(field) => AppError::Conflict(field),
            RepoError::MissingReference(what) => AppError::NotFound(what),
            RepoError::Backend(msg) => AppError::Internal(msg),
        }
    }
}

/// PostFilter
///
/// Optional equality filters for post listings. Results are always newest first.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub category: Option<String>,
    pub author_email: Option<String>,
    pub author_name: Option<String>,
}

impl PostFilter {
    pub fn by_category(name: impl Into<String>) -> Self {
        Self {
            category: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn by_author_email(email: impl Into<String>) -> Self {
        Self {
            author_email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn by_author_name(name: impl Into<String>) -> Self {
        Self {
            author_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub(crate) fn matches(&self, post: &Post) -> bool {
        self.category.as_ref().is_none_or(|c| &post.category == c)
            && self.author_email.as_ref().is_none_or(|e| &post.author_email == e)
            && self.author_name.as_ref().is_none_or(|n| &post.author_name == n)
    }
}

/// Repository Trait
///
/// The contract the core needs from the document store: three collections
/// (`accounts`, `posts`, `categories`) with unique indexes on `accounts.email`,
/// `posts.slug` and `categories.name`. Handlers and the integrity manager only
/// see this trait, so the backing store can be swapped (Postgres, in-memory).
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across
/// axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn find_account(&self, id: Uuid) -> RepoResult<Option<Account>>;
    async fn find_account_by_email(&self, email: &str) -> RepoResult<Option<Account>>;
    // `None` lists every account.
    async fn list_accounts(&self, role: Option<Role>) -> RepoResult<Vec<Account>>;
    async fn create_account(&self, account: NewAccount) -> RepoResult<Account>;
    /// Applies an edit. When the email changes, the account's posts follow it.
    async fn update_account(&self, id: Uuid, changes: AccountChanges)
    -> RepoResult<Option<Account>>;
    /// Removes the account and every post it authored as one atomic change.
    /// Returns the number of posts removed, or `None` if the account is absent.
    async fn delete_account_cascade(&self, id: Uuid) -> RepoResult<Option<u64>>;

    // --- Posts ---
    async fn list_posts(&self, filter: PostFilter) -> RepoResult<Vec<Post>>;
    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>>;
    async fn find_post_by_slug(&self, slug: &str) -> RepoResult<Option<Post>>;
    /// True if a post other than `exclude` already holds `slug`.
    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> RepoResult<bool>;
    async fn create_post(&self, post: NewPost) -> RepoResult<Post>;
    async fn update_post(&self, id: Uuid, changes: PostChanges) -> RepoResult<Option<Post>>;
    async fn delete_post(&self, id: Uuid) -> RepoResult<bool>;

    // --- Categories ---
    // Sorted by name.
    async fn list_categories(&self, active_only: bool) -> RepoResult<Vec<Category>>;
    async fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>>;
    async fn create_category(&self, category: NewCategory) -> RepoResult<Category>;
    /// Flips `is_active`; `None` if the category does not exist.
    async fn toggle_category(&self, id: Uuid) -> RepoResult<Option<Category>>;

    async fn get_stats(&self) -> RepoResult<AdminDashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
