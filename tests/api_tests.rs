mod common;

use common::{seed_account, seed_category, test_state};
use inkwell::{
    InMemoryRepository, create_router,
    models::{Account, HomeView, Post, Role, SessionResponse},
    repository::Repository,
};
use reqwest::{StatusCode, header, redirect};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub repo: Arc<InMemoryRepository>,
    pub admin: Account,
}

/// Serves the full router over a real socket, backed by the in-memory store.
async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let state = test_state(repo.clone());
    seed_category(repo.as_ref(), "Rust").await;
    let admin = seed_account(
        repo.as_ref(),
        &state.credentials,
        "root",
        "root@example.com",
        Role::Admin,
    )
    .await;

    let router = create_router(state);
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        admin,
    }
}

/// Client that surfaces redirects instead of following them.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap()
}

fn session_token(response: &reqwest::Response) -> String {
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    cookie
        .strip_prefix("token=")
        .and_then(|rest| rest.split(';').next())
        .unwrap()
        .to_string()
}

async fn register(app: &TestApp, username: &str, email: &str) -> String {
    let response = client()
        .post(format!("{}/register", app.address))
        .json(&json!({
            "username": username,
            "email": email,
            "password": "password123",
            "age": 27
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    session_token(&response)
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_protected_route_redirects_to_login() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/me", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");

    let landing = client()
        .get(format!("{}/login", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(landing.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forged_cookie_is_treated_as_signed_out() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/dashboard", app.address))
        .header(header::COOKIE, "token=eyJhbGciOiJIUzI1NiJ9.e30.invalid")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = spawn_app().await;
    register(&app, "dana", "dana@example.com").await;

    let login = client()
        .post(format!("{}/login", app.address))
        .json(&json!({ "email": "dana@example.com", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let token = session_token(&login);
    let session: SessionResponse = login.json().await.unwrap();
    assert_eq!(session.account.username, "dana");

    let me: Account = client()
        .get(format!("{}/me", app.address))
        .header(header::COOKIE, format!("token={token}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me.email, "dana@example.com");
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized_not_redirect() {
    let app = spawn_app().await;
    register(&app, "erin", "erin@example.com").await;

    let response = client()
        .post(format!("{}/login", app.address))
        .json(&json!({ "email": "erin@example.com", "password": "nope-nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_post_lifecycle_and_ownership() {
    let app = spawn_app().await;
    let owner = register(&app, "frank", "frank@example.com").await;
    let intruder = register(&app, "gina", "gina@example.com").await;

    let created = client()
        .post(format!("{}/posts", app.address))
        .header(header::COOKIE, format!("token={owner}"))
        .json(&json!({
            "title": "Hello, World!",
            "description": "First post",
            "category": "Rust"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let post: Post = created.json().await.unwrap();
    assert_eq!(post.slug, "hello-world");

    let public: Post = client()
        .get(format!("{}/post/hello-world", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(public.id, post.id);

    let hijack = client()
        .put(format!("{}/posts/{}", app.address, post.id))
        .header(header::COOKIE, format!("token={intruder}"))
        .json(&json!({ "title": "Mine now", "description": "..." }))
        .send()
        .await
        .unwrap();
    assert_eq!(hijack.status(), StatusCode::FORBIDDEN);

    let deleted = client()
        .delete(format!("{}/posts/{}", app.address, post.id))
        .header(header::COOKIE, format!("token={owner}"))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let home: HomeView = client()
        .get(format!("{}/posts", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(home.posts.is_empty());
}

#[tokio::test]
async fn test_admin_routes_forbid_users_and_allow_admin() {
    let app = spawn_app().await;
    let user = register(&app, "hank", "hank@example.com").await;

    let denied = client()
        .get(format!("{}/admin/accounts", app.address))
        .header(header::COOKIE, format!("token={user}"))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let admin_login = client()
        .post(format!("{}/login", app.address))
        .json(&json!({ "email": app.admin.email, "password": common::TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    let admin_token = session_token(&admin_login);

    let accounts: Vec<Account> = client()
        .get(format!("{}/admin/accounts", app.address))
        .header(header::COOKIE, format!("token={admin_token}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(accounts.len(), 1);

    let removed = client()
        .delete(format!("{}/admin/accounts/{}", app.address, accounts[0].id))
        .header(header::COOKIE, format!("token={admin_token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(removed.status(), StatusCode::OK);

    // The deleted user's session no longer resolves.
    let stale = client()
        .get(format!("{}/me", app.address))
        .header(header::COOKIE, format!("token={user}"))
        .send()
        .await
        .unwrap();
    assert_eq!(stale.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.repo.get_stats().await.unwrap().total_accounts, 1);
}
