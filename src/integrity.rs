//! Content integrity: slug uniqueness, post ownership, the account → posts
//! cascade and the bootstrap administrator.

use uuid::Uuid;

use crate::{
    auth::ensure_owner_or_admin,
    config::AdminConfig,
    credentials::CredentialService,
    error::{AppError, AppResult},
    models::{
        Account, CreatePostRequest, NewAccount, NewPost, Post, PostChanges, Role,
        UpdatePostRequest,
    },
    repository::{RepoError, Repository},
};

/// Upper bound on `-N` suffixes tried before giving up with `Conflict`.
pub const MAX_SLUG_ATTEMPTS: u32 = 1000;

/// Used when a title has no characters that survive slugification.
const FALLBACK_SLUG: &str = "post";

/// slugify
///
/// Lower-cases, transliterates common Latin letters to ASCII, turns whitespace
/// and hyphens into single `-` separators and drops every other character.
/// `"Hello, World!"` becomes `hello-world`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '-' {
            pending_separator = true;
            continue;
        }
        let piece = match ch {
            'a'..='z' | '0'..='9' => None,
            other => match transliterate(other) {
                Some(ascii) => Some(ascii),
                None => continue,
            },
        };
        if pending_separator && !slug.is_empty() {
            slug.push('-');
        }
        pending_separator = false;
        match piece {
            Some(ascii) => slug.push_str(ascii),
            None => slug.push(ch),
        }
    }
    slug
}

fn transliterate(ch: char) -> Option<&'static str> {
    let ascii = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ą' | 'ă' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'đ' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'ğ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'ı' => "i",
        'ł' | 'ľ' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'œ' => "oe",
        'ř' => "r",
        'ß' => "ss",
        'ś' | 'š' | 'ş' => "s",
        'ť' | 'ţ' => "t",
        'þ' => "th",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        '&' => "and",
        _ => return None,
    };
    Some(ascii)
}

/// reserve_unique_slug
///
/// Slugifies the candidate and probes `base`, `base-2`, `base-3`, … until no
/// post other than `exclude_id` holds it. The probe is only an optimistic
/// pre-check: the unique index on `posts.slug` remains the final arbiter.
pub async fn reserve_unique_slug(
    repo: &dyn Repository,
    candidate: &str,
    exclude_id: Option<Uuid>,
) -> AppResult<String> {
    let mut base = slugify(candidate);
    if base.is_empty() {
        base = FALLBACK_SLUG.to_string();
    }

    if !repo.slug_taken(&base, exclude_id).await? {
        return Ok(base);
    }
    for n in 2..=MAX_SLUG_ATTEMPTS {
        let attempt = format!("{base}-{n}");
        if !repo.slug_taken(&attempt, exclude_id).await? {
            tracing::debug!(slug = %attempt, "Slug collision resolved with suffix");
            return Ok(attempt);
        }
    }
    Err(AppError::Conflict("slug"))
}

/// Post mutation or deletion is allowed for the author or an admin only.
pub fn authorize_mutation(post: &Post, subject: &Account) -> AppResult<()> {
    ensure_owner_or_admin(subject, &post.author_email)
}

fn slug_source<'a>(slug: Option<&'a str>, title: &'a str) -> &'a str {
    slug.map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(title)
}

/// Resolves a category reference; only active categories may be assigned.
async fn require_active_category(repo: &dyn Repository, name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("category is required".to_string()));
    }
    match repo.find_category_by_name(name).await? {
        Some(category) if category.is_active => Ok(category.name),
        _ => Err(AppError::NotFound("Category")),
    }
}

/// create_post
///
/// Reserves a slug and inserts the post with the subject as author. If the
/// insert still loses a slug race, the slug is reserved again and the insert
/// retried once before `Conflict` is surfaced.
pub async fn create_post(
    repo: &dyn Repository,
    author: &Account,
    draft: CreatePostRequest,
) -> AppResult<Post> {
    let title = draft.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("title is required".to_string()));
    }
    let category = require_active_category(repo, &draft.category).await?;
    let source = slug_source(draft.slug.as_deref(), &title).to_string();

    let mut new_post = NewPost {
        slug: reserve_unique_slug(repo, &source, None).await?,
        title,
        description: draft.description,
        image: draft.image_key.unwrap_or_default(),
        category,
        author_email: author.email.clone(),
        author_name: author.username.clone(),
    };

    match repo.create_post(new_post.clone()).await {
        Err(RepoError::Conflict("slug")) => {
            tracing::info!(slug = %new_post.slug, "Slug taken at insert, retrying once");
            new_post.slug = reserve_unique_slug(repo, &source, None).await?;
            Ok(repo.create_post(new_post).await?)
        }
        other => Ok(other?),
    }
}

/// update_post
///
/// Owner or admin only. The slug is re-derived (excluding the post itself) so an
/// edit never steals another post's slug.
pub async fn update_post(
    repo: &dyn Repository,
    subject: &Account,
    id: Uuid,
    edit: UpdatePostRequest,
) -> AppResult<Post> {
    let post = repo.find_post(id).await?.ok_or(AppError::NotFound("Post"))?;
    authorize_mutation(&post, subject)?;

    let title = edit.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("title is required".to_string()));
    }
    let category = match edit.category.as_deref() {
        Some(name) => Some(require_active_category(repo, name).await?),
        None => None,
    };
    let source = slug_source(edit.slug.as_deref(), &title).to_string();

    let mut changes = PostChanges {
        slug: reserve_unique_slug(repo, &source, Some(id)).await?,
        title,
        description: edit.description,
        image: edit.image_key.filter(|key| !key.is_empty()),
        category,
    };

    let updated = match repo.update_post(id, changes.clone()).await {
        Err(RepoError::Conflict("slug")) => {
            tracing::info!(slug = %changes.slug, "Slug taken at update, retrying once");
            changes.slug = reserve_unique_slug(repo, &source, Some(id)).await?;
            repo.update_post(id, changes).await?
        }
        other => other?,
    };
    updated.ok_or(AppError::NotFound("Post"))
}

/// Deletes a post on behalf of its author or an admin.
pub async fn delete_post(repo: &dyn Repository, subject: &Account, id: Uuid) -> AppResult<()> {
    let post = repo.find_post(id).await?.ok_or(AppError::NotFound("Post"))?;
    authorize_mutation(&post, subject)?;

    if !repo.delete_post(id).await? {
        return Err(AppError::NotFound("Post"));
    }
    tracing::info!(post = %post.slug, by = %subject.email, "Post deleted");
    Ok(())
}

/// cascade_delete_account
///
/// Removes every post authored by the account and then the account itself, as
/// one storage transaction. Administrator accounts are never removed this way.
/// Returns the number of posts removed.
pub async fn cascade_delete_account(repo: &dyn Repository, account_id: Uuid) -> AppResult<u64> {
    let account = repo
        .find_account(account_id)
        .await?
        .ok_or(AppError::NotFound("Account"))?;
    if account.is_admin() {
        return Err(AppError::Forbidden);
    }

    let removed = repo
        .delete_account_cascade(account_id)
        .await?
        .ok_or(AppError::NotFound("Account"))?;

    tracing::info!(account = %account.email, posts_removed = removed, "Account deleted");
    Ok(removed)
}

/// bootstrap_admin
///
/// Ensures the reserved administrator exists. Safe to call on every start and
/// from concurrent starts: an existing account, or losing the insert race on the
/// unique email, both count as "already present". Returns true if it created
/// the account.
pub async fn bootstrap_admin(
    repo: &dyn Repository,
    credentials: &CredentialService,
    admin: &AdminConfig,
) -> AppResult<bool> {
    if admin.uses_default_password() {
        tracing::warn!(
            "Bootstrap administrator uses the built-in default password; set ADMIN_PASSWORD"
        );
    }

    // Stored the way login and profile edits normalize emails.
    let email = admin.email.trim().to_lowercase();

    if let Some(existing) = repo.find_account_by_email(&email).await? {
        if !existing.is_admin() {
            tracing::error!(email = %email, "Reserved admin email is held by a non-admin account");
        }
        return Ok(false);
    }

    let password_hash = credentials.hash_password(&admin.password).await?;
    let created = repo
        .create_account(NewAccount {
            username: admin.username.clone(),
            email,
            password_hash,
            age: admin.age,
            role: Role::Admin,
        })
        .await;

    match created {
        Ok(account) => {
            tracing::info!(email = %account.email, "Bootstrap administrator created");
            Ok(true)
        }
        Err(RepoError::Conflict(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
