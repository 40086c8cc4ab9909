//! Account lifecycle: registration, login, self edit and admin edit.

use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::{
    credentials::CredentialService,
    error::{AppError, AppResult},
    models::{
        Account, AccountChanges, AdminUpdateAccountRequest, LoginRequest, NewAccount,
        RegisterRequest, Role, UpdateMeRequest,
    },
    repository::Repository,
};

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Profile fields after trimming and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub username: String,
    pub email: String,
    pub age: i32,
}

/// validate_profile
///
/// Username must be non-empty, the email RFC-shaped, the age positive.
/// Emails are compared case-insensitively, so they are stored lower-cased.
pub fn validate_profile(username: &str, email: &str, age: i32) -> AppResult<Profile> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("username is required".to_string()));
    }
    let email = email.trim().to_lowercase();
    if !EMAIL_SHAPE.is_match(&email) {
        return Err(AppError::BadRequest("email address is not valid".to_string()));
    }
    if age < 1 {
        return Err(AppError::BadRequest("age must be a positive number".to_string()));
    }
    Ok(Profile {
        username: username.to_string(),
        email,
        age,
    })
}

/// Creates an ordinary user account. Duplicate emails surface as `Conflict`.
pub async fn register(
    repo: &dyn Repository,
    credentials: &CredentialService,
    req: RegisterRequest,
) -> AppResult<Account> {
    let profile = validate_profile(&req.username, &req.email, req.age)?;
    CredentialService::check_password_strength(&req.password)?;
    let password_hash = credentials.hash_password(&req.password).await?;

    let account = repo
        .create_account(NewAccount {
            username: profile.username,
            email: profile.email,
            password_hash,
            age: profile.age,
            role: Role::User,
        })
        .await?;

    tracing::info!(account = %account.email, "Account registered");
    Ok(account)
}

/// Checks a login attempt. Unknown email and wrong password are indistinguishable.
pub async fn login(
    repo: &dyn Repository,
    credentials: &CredentialService,
    req: LoginRequest,
) -> AppResult<Account> {
    let email = req.email.trim().to_lowercase();
    let Some(account) = repo.find_account_by_email(&email).await? else {
        return Err(AppError::InvalidCredentials);
    };

    if credentials
        .verify_password(&req.password, &account.password_hash)
        .await?
    {
        Ok(account)
    } else {
        tracing::info!(account = %account.email, "Rejected login attempt");
        Err(AppError::InvalidCredentials)
    }
}

/// update_own_account
///
/// Self edit of username, email, age and optionally password. The role is never
/// touched. Administrators keep the reserved email so bootstrap stays idempotent.
pub async fn update_own_account(
    repo: &dyn Repository,
    credentials: &CredentialService,
    subject: &Account,
    req: UpdateMeRequest,
) -> AppResult<Account> {
    let profile = validate_profile(&req.username, &req.email, req.age)?;
    if subject.is_admin() && profile.email != subject.email {
        return Err(AppError::Forbidden);
    }

    // A blank field keeps the current password; anything else is hashed as typed.
    let password_hash = match req.password.as_deref() {
        Some(password) if !password.trim().is_empty() => {
            CredentialService::check_password_strength(password)?;
            Some(credentials.hash_password(password).await?)
        }
        _ => None,
    };

    repo.update_account(
        subject.id,
        AccountChanges {
            username: profile.username,
            email: profile.email,
            age: profile.age,
            password_hash,
        },
    )
    .await?
    .ok_or(AppError::NotFound("Account"))
}

/// admin_update_account
///
/// Username, email and age only. Administrator accounts are not editable here.
pub async fn admin_update_account(
    repo: &dyn Repository,
    id: Uuid,
    req: AdminUpdateAccountRequest,
) -> AppResult<Account> {
    let target = repo
        .find_account(id)
        .await?
        .ok_or(AppError::NotFound("Account"))?;
    if target.is_admin() {
        return Err(AppError::Forbidden);
    }

    let profile = validate_profile(&req.username, &req.email, req.age)?;
    repo.update_account(
        id,
        AccountChanges {
            username: profile.username,
            email: profile.email,
            age: profile.age,
            password_hash: None,
        },
    )
    .await?
    .ok_or(AppError::NotFound("Account"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_is_trimmed_and_lowercased() {
        let profile = validate_profile("  alice ", " Alice@Example.COM ", 30).unwrap();
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.email, "alice@example.com");
    }

    #[test]
    fn rejects_malformed_email() {
        for email in ["", "alice", "alice@", "alice@example", "a b@c.d"] {
            assert!(
                validate_profile("alice", email, 30).is_err(),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_blank_username_and_non_positive_age() {
        assert!(validate_profile("   ", "a@b.co", 30).is_err());
        assert!(validate_profile("alice", "a@b.co", 0).is_err());
    }
}
