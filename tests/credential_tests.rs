mod common;

use chrono::{Duration, Utc};
use common::{TEST_SECRET, test_credentials};
use inkwell::{
    AppError,
    credentials::CredentialService,
    models::{Account, Role},
};
use uuid::Uuid;

fn alice() -> Account {
    Account {
        id: Uuid::new_v4(),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        password_hash: String::new(),
        age: 29,
        role: Role::User,
    }
}

// --- Password Hashing ---

#[tokio::test]
async fn test_hash_then_verify() {
    let creds = test_credentials();
    let hash = creds.hash_password("s3cret!").await.unwrap();

    assert_ne!(hash, "s3cret!");
    assert!(creds.verify_password("s3cret!", &hash).await.unwrap());
    assert!(!creds.verify_password("S3cret!", &hash).await.unwrap());
}

#[tokio::test]
async fn test_hashes_are_salted() {
    let creds = test_credentials();
    let first = creds.hash_password("same-password").await.unwrap();
    let second = creds.hash_password("same-password").await.unwrap();

    assert_ne!(first, second);
    assert!(creds.verify_password("same-password", &second).await.unwrap());
}

#[tokio::test]
async fn test_empty_password_is_weak_input() {
    let creds = test_credentials();
    let err = creds.hash_password("").await.unwrap_err();
    assert!(matches!(err, AppError::WeakInput(_)));
}

#[tokio::test]
async fn test_malformed_stored_hash_is_corrupt_credential() {
    let creds = test_credentials();
    let err = creds
        .verify_password("anything", "not-a-bcrypt-hash")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CorruptCredential));
}

// --- Session Claims ---

#[test]
fn test_claim_round_trip() {
    let creds = test_credentials();
    let account = alice();
    let token = creds.issue_claim(&account).unwrap();

    let claims = creds.verify_claim(Some(&token)).unwrap();
    assert_eq!(claims.sub, "alice@example.com");
    assert_eq!(claims.username, "alice");
    assert_eq!(claims.age, 29);
    assert_eq!(claims.role, Role::User);
    assert_eq!(claims.exp - claims.iat, 3600);
}

#[test]
fn test_expired_claim_is_invalid_session() {
    let creds = test_credentials();
    let two_hours_ago = Utc::now() - Duration::hours(2);
    let token = creds.issue_claim_at(&alice(), two_hours_ago).unwrap();

    let err = creds.verify_claim(Some(&token)).unwrap_err();
    assert!(matches!(err, AppError::InvalidSession));
}

#[test]
fn test_claim_just_inside_lifetime_is_accepted() {
    let creds = test_credentials();
    let almost_an_hour_ago = Utc::now() - Duration::minutes(59);
    let token = creds.issue_claim_at(&alice(), almost_an_hour_ago).unwrap();

    assert!(creds.verify_claim(Some(&token)).is_ok());
}

#[test]
fn test_claim_signed_with_other_secret_is_rejected() {
    let other = CredentialService::new("a-different-secret", Duration::hours(1), 4);
    let token = other.issue_claim(&alice()).unwrap();

    let err = test_credentials().verify_claim(Some(&token)).unwrap_err();
    assert!(matches!(err, AppError::InvalidSession));
}

#[test]
fn test_tampered_payload_is_rejected() {
    let creds = test_credentials();
    let token = creds.issue_claim(&alice()).unwrap();

    // Swap the payload segment for one from an admin token signed elsewhere.
    let forger = CredentialService::new("forger", Duration::hours(1), 4);
    let mut admin = alice();
    admin.role = Role::Admin;
    let forged = forger.issue_claim(&admin).unwrap();

    let parts: Vec<&str> = token.split('.').collect();
    let forged_parts: Vec<&str> = forged.split('.').collect();
    let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

    assert!(creds.verify_claim(Some(&spliced)).is_err());
}

#[test]
fn test_missing_and_malformed_tokens() {
    let creds = CredentialService::new(TEST_SECRET, Duration::hours(1), 4);
    for token in [None, Some(""), Some("garbage"), Some("a.b.c")] {
        let err = creds.verify_claim(token).unwrap_err();
        assert!(
            matches!(err, AppError::InvalidSession),
            "{token:?} should be an invalid session"
        );
    }
}
