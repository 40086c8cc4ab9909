mod common;

use async_trait::async_trait;
use common::{seed_account, seed_category, test_credentials};
use inkwell::{
    AppError, InMemoryRepository,
    integrity::{create_post, update_post},
    models::{
        Account, AccountChanges, AdminDashboardStats, Category, CreatePostRequest, NewAccount,
        NewCategory, NewPost, Post, PostChanges, Role, UpdatePostRequest,
    },
    repository::{PostFilter, RepoResult, Repository},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

// --- Stale Slug Index ---

/// Wraps the in-memory store but answers `slug_taken` with a stale `false` a
/// fixed number of times, so the insert itself is what detects the collision.
struct StaleSlugIndex {
    inner: InMemoryRepository,
    stale_answers: AtomicUsize,
    post_writes: AtomicUsize,
}

impl StaleSlugIndex {
    fn new(stale_answers: usize) -> Self {
        Self {
            inner: InMemoryRepository::new(),
            stale_answers: AtomicUsize::new(stale_answers),
            post_writes: AtomicUsize::new(0),
        }
    }

    fn always_stale() -> Self {
        Self::new(usize::MAX)
    }

    fn writes(&self) -> usize {
        self.post_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for StaleSlugIndex {
    async fn find_account(&self, id: Uuid) -> RepoResult<Option<Account>> {
        self.inner.find_account(id).await
    }
    async fn find_account_by_email(&self, email: &str) -> RepoResult<Option<Account>> {
        self.inner.find_account_by_email(email).await
    }
    async fn list_accounts(&self, role: Option<Role>) -> RepoResult<Vec<Account>> {
        self.inner.list_accounts(role).await
    }
    async fn create_account(&self, account: NewAccount) -> RepoResult<Account> {
        self.inner.create_account(account).await
    }
    async fn update_account(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> RepoResult<Option<Account>> {
        self.inner.update_account(id, changes).await
    }
    async fn delete_account_cascade(&self, id: Uuid) -> RepoResult<Option<u64>> {
        self.inner.delete_account_cascade(id).await
    }
    async fn list_posts(&self, filter: PostFilter) -> RepoResult<Vec<Post>> {
        self.inner.list_posts(filter).await
    }
    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        self.inner.find_post(id).await
    }
    async fn find_post_by_slug(&self, slug: &str) -> RepoResult<Option<Post>> {
        self.inner.find_post_by_slug(slug).await
    }
    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> RepoResult<bool> {
        let stale = self
            .stale_answers
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(false);
        }
        self.inner.slug_taken(slug, exclude).await
    }
    async fn create_post(&self, post: NewPost) -> RepoResult<Post> {
        self.post_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create_post(post).await
    }
    async fn update_post(&self, id: Uuid, changes: PostChanges) -> RepoResult<Option<Post>> {
        self.post_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_post(id, changes).await
    }
    async fn delete_post(&self, id: Uuid) -> RepoResult<bool> {
        self.inner.delete_post(id).await
    }
    async fn list_categories(&self, active_only: bool) -> RepoResult<Vec<Category>> {
        self.inner.list_categories(active_only).await
    }
    async fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        self.inner.find_category_by_name(name).await
    }
    async fn create_category(&self, category: NewCategory) -> RepoResult<Category> {
        self.inner.create_category(category).await
    }
    async fn toggle_category(&self, id: Uuid) -> RepoResult<Option<Category>> {
        self.inner.toggle_category(id).await
    }
    async fn get_stats(&self) -> RepoResult<AdminDashboardStats> {
        self.inner.get_stats().await
    }
}

fn draft(title: &str) -> CreatePostRequest {
    CreatePostRequest {
        title: title.to_string(),
        description: "Body text".to_string(),
        category: "Rust".to_string(),
        ..Default::default()
    }
}

/// Seeds an author, the category and posts with the given titles, all written
/// straight to the inner store so no stale answer is spent.
async fn seed(repo: &StaleSlugIndex, titles: &[&str]) -> (Account, Vec<Post>) {
    let creds = test_credentials();
    seed_category(&repo.inner, "Rust").await;
    let alice = seed_account(&repo.inner, &creds, "alice", "alice@example.com", Role::User).await;

    let mut posts = Vec::new();
    for title in titles {
        posts.push(create_post(&repo.inner, &alice, draft(title)).await.unwrap());
    }
    (alice, posts)
}

// --- Tests ---

#[tokio::test]
async fn test_create_recovers_from_one_lost_slug_race() {
    let repo = StaleSlugIndex::new(1);
    let (alice, _) = seed(&repo, &["Hello"]).await;

    let post = create_post(&repo, &alice, draft("Hello")).await.unwrap();
    assert_eq!(post.slug, "hello-2");
    assert_eq!(repo.writes(), 2);
}

#[tokio::test]
async fn test_update_recovers_from_one_lost_slug_race() {
    let repo = StaleSlugIndex::new(1);
    let (alice, posts) = seed(&repo, &["Taken", "Other"]).await;

    let edited = update_post(
        &repo,
        &alice,
        posts[1].id,
        UpdatePostRequest {
            title: "Taken".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(edited.slug, "taken-2");
    assert_eq!(repo.writes(), 2);
}

#[tokio::test]
async fn test_create_surfaces_conflict_after_second_loss() {
    let repo = StaleSlugIndex::always_stale();
    let (alice, _) = seed(&repo, &["Hello"]).await;

    let err = create_post(&repo, &alice, draft("Hello")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict("slug")));
    assert_eq!(repo.writes(), 2);
    assert_eq!(repo.inner.list_posts(PostFilter::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_surfaces_conflict_after_second_loss() {
    let repo = StaleSlugIndex::always_stale();
    let (alice, posts) = seed(&repo, &["Taken", "Other"]).await;

    let err = update_post(
        &repo,
        &alice,
        posts[1].id,
        UpdatePostRequest {
            title: "Taken".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict("slug")));
    assert_eq!(repo.writes(), 2);

    let unchanged = repo.inner.find_post(posts[1].id).await.unwrap().unwrap();
    assert_eq!(unchanged.slug, "other");
}
