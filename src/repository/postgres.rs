use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{PostFilter, RepoError, RepoResult, Repository};
use crate::models::{
    Account, AccountChanges, AdminDashboardStats, Category, NewAccount, NewCategory, NewPost, Post,
    PostChanges, Role,
};

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, age, role";
const POST_COLUMNS: &str =
    "id, title, slug, description, image, category, author_email, author_name, created_at";
const CATEGORY_COLUMNS: &str = "id, name, image, is_active, created_at";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Uniqueness and the post → account reference are enforced by the schema in
/// `migrations/`; violations come back as `RepoError::Conflict` or
/// `RepoError::MissingReference`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// map_db_error
///
/// Translates sqlx failures into the store's error contract. Unique and foreign
/// key violations are recognised by constraint name; everything else is logged
/// and surfaced as an opaque backend failure.
fn map_db_error(context: &'static str) -> impl Fn(sqlx::Error) -> RepoError {
    move |err| {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return RepoError::Conflict(conflict_field(db_err.constraint()));
            }
            if db_err.is_foreign_key_violation() {
                return RepoError::MissingReference("Account");
            }
        }
        tracing::error!("{} error: {:?}", context, err);
        RepoError::Backend(format!("{context} failed"))
    }
}

fn conflict_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("accounts_email_key") => "email",
        Some("posts_slug_key") => "slug",
        Some("categories_name_key") => "category name",
        _ => "value",
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_account(&self, id: Uuid) -> RepoResult<Option<Account>> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error("find_account"))
    }

    async fn find_account_by_email(&self, email: &str) -> RepoResult<Option<Account>> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error("find_account_by_email"))
    }

    async fn list_accounts(&self, role: Option<Role>) -> RepoResult<Vec<Account>> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {ACCOUNT_COLUMNS} FROM accounts"));
        if let Some(role) = role {
            builder.push(" WHERE role = ");
            builder.push_bind(role.as_str());
        }
        builder.push(" ORDER BY username ASC");

        builder
            .build_query_as::<Account>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error("list_accounts"))
    }

    async fn create_account(&self, account: NewAccount) -> RepoResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO accounts (id, username, email, password_hash, age, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.age)
        .bind(account.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error("create_account"))
    }

    /// update_account
    ///
    /// Role is never part of the SET list. `posts.author_email` follows an email
    /// change through the `ON UPDATE CASCADE` reference.
    async fn update_account(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> RepoResult<Option<Account>> {
        sqlx::query_as::<_, Account>(&format!(
            "UPDATE accounts \
             SET username = $2, email = $3, age = $4, \
                 password_hash = COALESCE($5, password_hash) \
             WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(changes.age)
        .bind(changes.password_hash.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error("update_account"))
    }

    /// delete_account_cascade
    ///
    /// Posts first, then the account, inside one transaction. Any failure rolls
    /// both back, so no caller can observe a half-deleted author.
    async fn delete_account_cascade(&self, id: Uuid) -> RepoResult<Option<u64>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(map_db_error("delete_account_cascade"))?;

        let email: Option<String> =
            sqlx::query_scalar("SELECT email FROM accounts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_error("delete_account_cascade"))?;

        let Some(email) = email else {
            return Ok(None);
        };

        let removed = sqlx::query("DELETE FROM posts WHERE author_email = $1")
            .bind(&email)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error("delete_account_cascade"))?
            .rows_affected();

        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error("delete_account_cascade"))?;

        tx.commit()
            .await
            .map_err(map_db_error("delete_account_cascade"))?;

        Ok(Some(removed))
    }

    /// list_posts
    ///
    /// Builds the filter with QueryBuilder so every value is a bound parameter.
    async fn list_posts(&self, filter: PostFilter) -> RepoResult<Vec<Post>> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE TRUE"));

        if let Some(category) = filter.category {
            builder.push(" AND category = ");
            builder.push_bind(category);
        }
        if let Some(email) = filter.author_email {
            builder.push(" AND author_email = ");
            builder.push_bind(email);
        }
        if let Some(name) = filter.author_name {
            builder.push(" AND author_name = ");
            builder.push_bind(name);
        }
        builder.push(" ORDER BY created_at DESC");

        builder
            .build_query_as::<Post>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error("list_posts"))
    }

    async fn find_post(&self, id: Uuid) -> RepoResult<Option<Post>> {
        sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error("find_post"))
    }

    async fn find_post_by_slug(&self, slug: &str) -> RepoResult<Option<Post>> {
        sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error("find_post_by_slug"))
    }

    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM posts WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error("slug_taken"))
    }

    async fn create_post(&self, post: NewPost) -> RepoResult<Post> {
        sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (id, title, slug, description, image, category, author_email, author_name, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW()) RETURNING {POST_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.description)
        .bind(&post.image)
        .bind(&post.category)
        .bind(&post.author_email)
        .bind(&post.author_name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error("create_post"))
    }

    async fn update_post(&self, id: Uuid, changes: PostChanges) -> RepoResult<Option<Post>> {
        sqlx::query_as::<_, Post>(&format!(
            "UPDATE posts \
             SET title = $2, slug = $3, description = $4, \
                 image = COALESCE($5, image), category = COALESCE($6, category) \
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.slug)
        .bind(&changes.description)
        .bind(changes.image.as_deref())
        .bind(changes.category.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error("update_post"))
    }

    async fn delete_post(&self, id: Uuid) -> RepoResult<bool> {
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map(|res| res.rows_affected() > 0)
            .map_err(map_db_error("delete_post"))
    }

    async fn list_categories(&self, active_only: bool) -> RepoResult<Vec<Category>> {
        let sql = if active_only {
            format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE is_active = TRUE ORDER BY name ASC")
        } else {
            format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC")
        };
        sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error("list_categories"))
    }

    async fn find_category_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error("find_category_by_name"))
    }

    async fn create_category(&self, category: NewCategory) -> RepoResult<Category> {
        sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (id, name, image, is_active, created_at) \
             VALUES ($1, $2, $3, TRUE, NOW()) RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&category.name)
        .bind(&category.image)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error("create_category"))
    }

    async fn toggle_category(&self, id: Uuid) -> RepoResult<Option<Category>> {
        sqlx::query_as::<_, Category>(&format!(
            "UPDATE categories SET is_active = NOT is_active WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error("toggle_category"))
    }

    /// get_stats
    ///
    /// Compiles the admin dashboard counters in a single round trip.
    async fn get_stats(&self) -> RepoResult<AdminDashboardStats> {
        let (total_accounts, total_posts, total_categories, active_categories): (i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT \
                    (SELECT COUNT(*) FROM accounts), \
                    (SELECT COUNT(*) FROM posts), \
                    (SELECT COUNT(*) FROM categories), \
                    (SELECT COUNT(*) FROM categories WHERE is_active)",
            )
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error("get_stats"))?;

        Ok(AdminDashboardStats {
            total_accounts,
            total_posts,
            total_categories,
            active_categories,
        })
    }
}
