use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    credentials::CredentialService,
    error::{AppError, AppResult},
    models::Account,
    repository::{Repository, RepositoryState},
    session::extract_session_token,
};

// --- Access Guard ---
//
// Authentication (is the claim valid, does the account still exist) and
// authorization (role or ownership) are two separate, sequential checks. Every
// privileged decision uses the role stored on the account, never the role hint
// embedded in the token.

/// require_user
///
/// Verifies the session claim, then re-reads the account it names. A missing,
/// expired or forged token, or a token for an account that no longer exists,
/// fails with `Unauthenticated`. Does not look at the role.
pub async fn require_user(
    repo: &dyn Repository,
    credentials: &CredentialService,
    token: Option<&str>,
) -> AppResult<Account> {
    let claims = credentials
        .verify_claim(token)
        .map_err(|_| AppError::Unauthenticated)?;

    repo.find_account_by_email(&claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::info!("Session names an account that no longer exists");
            AppError::Unauthenticated
        })
}

/// require_admin
///
/// `require_user`, then the *stored* role must be admin. A valid session with
/// any other role is `Forbidden`, not a redirect.
pub async fn require_admin(
    repo: &dyn Repository,
    credentials: &CredentialService,
    token: Option<&str>,
) -> AppResult<Account> {
    let account = require_user(repo, credentials, token).await?;
    if !account.is_admin() {
        tracing::warn!(account = %account.email, "Admin access denied");
        return Err(AppError::Forbidden);
    }
    Ok(account)
}

/// require_owner_or_admin
///
/// Authenticates, then grants access only to the owner of the resource or to an
/// account whose stored role is admin.
pub async fn require_owner_or_admin(
    repo: &dyn Repository,
    credentials: &CredentialService,
    token: Option<&str>,
    resource_owner_email: &str,
) -> AppResult<Account> {
    let account = require_user(repo, credentials, token).await?;
    ensure_owner_or_admin(&account, resource_owner_email)?;
    Ok(account)
}

/// The ownership rule shared by the guard and the integrity manager.
pub fn ensure_owner_or_admin(subject: &Account, resource_owner_email: &str) -> AppResult<()> {
    if subject.email == resource_owner_email || subject.is_admin() {
        Ok(())
    } else {
        tracing::warn!(account = %subject.email, "Ownership check failed");
        Err(AppError::Forbidden)
    }
}

// --- Extractors ---

/// AuthUser Extractor Result
///
/// The resolved, authenticated account of the caller. Handlers that take an
/// `AuthUser` never run for anonymous or invalid sessions.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Account);

/// AdminUser Extractor Result
///
/// An authenticated caller whose stored role is admin at the time of the request.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Account);

/// AuthUser Extractor Implementation
///
/// Pulls the repository and credential service out of the application state,
/// reads the session token (cookie or Bearer header) and runs `require_user`.
///
/// Rejection: `AppError::Unauthenticated`, which responds with a redirect to the
/// login entry point and clears the session cookie.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    CredentialService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let credentials = CredentialService::from_ref(state);
        let token = extract_session_token(&parts.headers);

        let account = require_user(repo.as_ref(), &credentials, token.as_deref()).await?;
        Ok(AuthUser(account))
    }
}

/// AdminUser Extractor Implementation
///
/// Same token handling as `AuthUser`, followed by the admin corroboration.
/// Rejection: `Unauthenticated` (redirect) or `Forbidden` (explicit denial).
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    CredentialService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let credentials = CredentialService::from_ref(state);
        let token = extract_session_token(&parts.headers);

        let account = require_admin(repo.as_ref(), &credentials, token.as_deref()).await?;
        Ok(AdminUser(account))
    }
}
