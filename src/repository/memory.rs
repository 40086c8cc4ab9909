use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{PostFilter, RepoError, RepoResult, Repository};
use crate::models::{
    Account, AccountChanges, AdminDashboardStats, Category, NewAccount, NewCategory, NewPost, Post,
    PostChanges, Role,
};

#[derive(Default)]
struct Collections {
    accounts: Vec<Account>,
    posts: Vec<Post>,
    categories: Vec<Category>,
}

/// InMemoryRepository
///
/// A process-local store honouring the same contract as Postgres: unique email,
/// slug and category name, posts referencing an existing author, and atomic
/// cascade delete. Every operation runs under a single lock, which is never held
/// across an await point. Used by the test suites and for database-free local runs.
#[derive(Default)]
pub struct InMemoryRepository {
    inner: Mutex<Collections>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Collections>> {
        self.inner
            .lock()
            .map_err(|_| RepoError::Backend("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_account(&self, id: Uuid) -> RepoResult<Option<Account>> {
        let store = self.lock()?;
        Ok(store.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> RepoResult<Option<Account>> {
        let store = self.lock()?;
        Ok(store.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn list_accounts(&self, role: Option<Role>) -> RepoResult<Vec<Account>> {
        let store = self.lock()?;
        let mut accounts: Vec<Account> = store
            .accounts
            .iter()
            .filter(|a| role.is_none_or(|r| a.role == r))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(accounts)
    }

    async fn create_account(&self, account: NewAccount) -> RepoResult<Account> {
        let mut store = self.lock()?;
        if store.accounts.iter().any(|a| a.email == account.email) {
            return Err(RepoError::Conflict("email"));
        }
        let created = Account {
            id: Uuid::new_v4(),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            age: account.age,
            role: account.role,
        };
        store.accounts.push(created.clone());
        Ok(created)
    }

    async fn update_account(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> RepoResult<Option<Account>> {
        let mut store = self.lock()?;
        if store
            .accounts
            .iter()
            .any(|a| a.id != id && a.email == changes.email)
        {
            return Err(RepoError::Conflict("email"));
        }
        let Some(account) = store.accounts.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };

        let previous_email = std::mem::replace(&mut account.email, changes.email);
        account.username = changes.username;
        account.age = changes.age;
        if let Some(hash) = changes.password_hash {
            account.password_hash = hash;
        }
        let updated = account.clone();

        if previous_email != updated.email {
            for post in store.posts.iter_mut().filter(|p| p.author_email == previous_email) {
                post.author_email = updated.email.clone();
            }
        }
        Ok(Some(updated))
    }

    async fn delete_account_cascade(&self, id: Uuid) -> RepoResult<Option<u64>> {
        let mut store = self.lock()?;
        let Some(index) = store.accounts.iter().position(|a| a.id == id) else {
            return Ok(None);
        };
        let email = store.accounts[index].email.clone();

        let before = store.posts.len();
        store.posts.retain(|p| p.author_email != email);
        let removed = (before - store.posts.len()) as u64;
        store.accounts.remove(index);
        Ok(Some(removed))
    }

    async fn list_posts(&self, filter: PostFilter) -> RepoResult<Vec<Post>> {
        let store = self.lock()?;
        let mut posts: Vec<Post> = store
            .posts
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        let store = self.lock()?;
        Ok(store.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn find_post_by_slug(&self, slug: &str) -> RepoResult<Option<Post>> {
        let store = self.lock()?;
        Ok(store.posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> RepoResult<bool> {
        let store = self.lock()?;
        Ok(store
            .posts
            .iter()
            .any(|p| p.slug == slug && Some(p.id) != exclude))
    }

    async fn create_post(&self, post: NewPost) -> RepoResult<Post> {
        let mut store = self.lock()?;
        if !store.accounts.iter().any(|a| a.email == post.author_email) {
            return Err(RepoError::MissingReference("Account"));
        }
        if store.posts.iter().any(|p| p.slug == post.slug) {
            return Err(RepoError::Conflict("slug"));
        }
        let created = Post {
            id: Uuid::new_v4(),
            title: post.title,
            slug: post.slug,
            description: post.description,
            image: post.image,
            category: post.category,
            author_email: post.author_email,
            author_name: post.author_name,
            created_at: Utc::now(),
        };
        store.posts.push(created.clone());
        Ok(created)
    }

    async fn update_post(&self, id: Uuid, changes: PostChanges) -> RepoResult<Option<Post>> {
        let mut store = self.lock()?;
        if store.posts.iter().any(|p| p.id != id && p.slug == changes.slug) {
            return Err(RepoError::Conflict("slug"));
        }
        let Some(post) = store.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        post.title = changes.title;
        post.slug = changes.slug;
        post.description = changes.description;
        if let Some(image) = changes.image {
            post.image = image;
        }
        if let Some(category) = changes.category {
            post.category = category;
        }
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.lock()?;
        let before = store.posts.len();
        store.posts.retain(|p| p.id != id);
        Ok(store.posts.len() < before)
    }

    async fn list_categories(&self, active_only: bool) -> RepoResult<Vec<Category>> {
        let store = self.lock()?;
        let mut categories: Vec<Category> = store
            .categories
            .iter()
            .filter(|c| !active_only || c.is_active)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        let store = self.lock()?;
        Ok(store.categories.iter().find(|c| c.name == name).cloned())
    }

    async fn create_category(&self, category: NewCategory) -> RepoResult<Category> {
        let mut store = self.lock()?;
        if store.categories.iter().any(|c| c.name == category.name) {
            return Err(RepoError::Conflict("category name"));
        }
        let created = Category {
            id: Uuid::new_v4(),
            name: category.name,
            image: category.image,
            is_active: true,
            created_at: Utc::now(),
        };
        store.categories.push(created.clone());
        Ok(created)
    }

    async fn toggle_category(&self, id: Uuid) -> RepoResult<Option<Category>> {
        let mut store = self.lock()?;
        Ok(store.categories.iter_mut().find(|c| c.id == id).map(|c| {
            c.is_active = !c.is_active;
            c.clone()
        }))
    }

    async fn get_stats(&self) -> RepoResult<AdminDashboardStats> {
        let store = self.lock()?;
        Ok(AdminDashboardStats {
            total_accounts: store.accounts.len() as i64,
            total_posts: store.posts.len() as i64,
            total_categories: store.categories.len() as i64,
            active_categories: store.categories.iter().filter(|c| c.is_active).count() as i64,
        })
    }
}
