use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{Account, Role},
};

/// Shortest password accepted for a new or changed credential.
pub const MIN_PASSWORD_LEN: usize = 6;

/// SessionClaims
///
/// The payload signed into every session token. `username` and `age` are a
/// snapshot taken at issuance. `role` is only a hint: privileged checks always
/// re-read the account store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (sub): the account email.
    pub sub: String,
    pub username: String,
    pub age: i32,
    pub role: Role,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
}

/// CredentialService
///
/// Password hashing and session claim signing. Built once at startup from
/// `AppConfig`; the signing secret never changes for the life of the process.
/// Rotating the secret (a restart with a new value) invalidates every
/// outstanding token.
#[derive(Clone)]
pub struct CredentialService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    session_ttl: Duration,
    bcrypt_cost: u32,
}

impl CredentialService {
    pub fn new(secret: &str, session_ttl: Duration, bcrypt_cost: u32) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Expiry is exact; no clock-skew grace period.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            session_ttl,
            bcrypt_cost,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            Duration::seconds(config.session_ttl_secs),
            config.bcrypt_cost,
        )
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Rejects passwords too short to be accepted on registration or change.
    pub fn check_password_strength(password: &str) -> AppResult<()> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::WeakInput(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }

    /// hash_password
    ///
    /// Salted bcrypt hash at the configured work factor. Runs on the blocking
    /// pool so a slow hash never stalls unrelated requests.
    pub async fn hash_password(&self, password: &str) -> AppResult<String> {
        if password.is_empty() {
            return Err(AppError::WeakInput("password must not be empty".to_string()));
        }
        let password = password.to_owned();
        let cost = self.bcrypt_cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(format!("hash task failed: {e}")))?
            .map_err(|e| AppError::Internal(format!("bcrypt hash failed: {e}")))
    }

    /// verify_password
    ///
    /// Constant-time comparison via bcrypt. A mismatch is `Ok(false)`; only a
    /// malformed stored hash is an error.
    pub async fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let password = password.to_owned();
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("verify task failed: {e}")))?
            .map_err(|e| {
                tracing::warn!("Password hash rejected by bcrypt: {}", e);
                AppError::CorruptCredential
            })
    }

    pub fn issue_claim(&self, account: &Account) -> AppResult<String> {
        self.issue_claim_at(account, Utc::now())
    }

    /// issue_claim_at
    ///
    /// Signs `{sub, username, age, role}` with an expiry of `issued_at + ttl`.
    pub fn issue_claim_at(&self, account: &Account, issued_at: DateTime<Utc>) -> AppResult<String> {
        let expires_at = issued_at + self.session_ttl;
        let claims = SessionClaims {
            sub: account.email.clone(),
            username: account.username.clone(),
            age: account.age,
            role: account.role,
            iat: timestamp(issued_at),
            exp: timestamp(expires_at),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("failed to sign session claim: {e}")))
    }

    /// verify_claim
    ///
    /// Every failure (no token, bad signature, expired, malformed payload) is
    /// `InvalidSession`. Callers must treat that as "not signed in" and stop.
    pub fn verify_claim(&self, token: Option<&str>) -> AppResult<SessionClaims> {
        let token = token.ok_or(AppError::InvalidSession)?;

        match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("Session token expired"),
                    ErrorKind::InvalidSignature => tracing::warn!("Session token signature mismatch"),
                    other => tracing::debug!("Session token rejected: {:?}", other),
                }
                Err(AppError::InvalidSession)
            }
        }
    }
}

fn timestamp(at: DateTime<Utc>) -> usize {
    at.timestamp().max(0) as usize
}
