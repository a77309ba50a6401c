// tests/router_tests.rs

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use quizdesk::{
    config::Config,
    error::AppError,
    models::result::QuizResult,
    routes,
    state::AppState,
    store::{KeyValueStore, MemoryStore, Store, StoreKey},
    utils::jwt::{ADMIN_ROLE, sign_jwt},
};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "router_test_secret";

fn app_with(store: Store) -> axum::Router {
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: "admin".to_string(),
        admin_password: "pw".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        log_dir: "logs".to_string(),
        static_dir: None,
        intent_ttl_secs: 60,
        session_ttl_secs: 600,
        seed_default_quiz: false,
    };
    routes::create_router(AppState::new(store, config).unwrap())
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let response = app_with(Store::in_memory())
        .oneshot(get("/api/admin/quizzes", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admin_role_is_forbidden() {
    let token = sign_jwt("someone", "user", SECRET, 60).unwrap();
    let response = app_with(Store::in_memory())
        .oneshot(get("/api/admin/quizzes", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn empty_ledger_stats_are_zero() {
    let token = sign_jwt("admin", ADMIN_ROLE, SECRET, 60).unwrap();
    let response = app_with(Store::in_memory())
        .oneshot(get("/api/admin/results/stats", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let stats: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stats["total_attempts"], 0);
    assert_eq!(stats["average_percentage"], 0.0);
    assert_eq!(stats["pass_rate"], 0.0);
}

#[tokio::test]
async fn logout_clears_admin_flag() {
    let store = Store::in_memory();
    store.save(StoreKey::AdminLoggedIn, &true).await.unwrap();

    let token = sign_jwt("admin", ADMIN_ROLE, SECRET, 60).unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app_with(store.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let flag: Option<bool> = store.load(StoreKey::AdminLoggedIn).await.unwrap();
    assert_eq!(flag, Some(false));
}

#[tokio::test]
async fn unknown_result_detail_is_not_found() {
    let token = sign_jwt("admin", ADMIN_ROLE, SECRET, 60).unwrap();
    let response = app_with(Store::in_memory())
        .oneshot(get("/api/admin/results/7", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Memory backend whose next ledger write fails.
#[derive(Default)]
struct FailingLedgerWrite {
    inner: MemoryStore,
    armed: AtomicBool,
}

#[async_trait]
impl KeyValueStore for FailingLedgerWrite {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, AppError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: StoreKey, value: String) -> Result<(), AppError> {
        if key == StoreKey::AllQuizResults && self.armed.swap(false, Ordering::SeqCst) {
            return Err(AppError::InternalServerError("disk full".to_string()));
        }
        self.inner.put(key, value).await
    }

    async fn remove(&self, key: StoreKey) -> Result<(), AppError> {
        self.inner.remove(key).await
    }
}

async fn post(app: &axum::Router, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method("POST").uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn failed_ledger_write_keeps_session_submittable() {
    let backend = Arc::new(FailingLedgerWrite::default());
    backend.armed.store(true, Ordering::SeqCst);
    let store = Store::new(backend);
    let app = app_with(store.clone());

    let (status, view) = post(
        &app,
        "/api/quiz/sessions",
        Some(json!({ "taker_id": "E001", "taker_name": "Ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = view["session_id"].as_str().unwrap().to_string();

    // Built-in set has three questions.
    for _ in 0..2 {
        let (status, _) = post(&app, &format!("/api/quiz/sessions/{}/next", id), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let submit = format!("/api/quiz/sessions/{}/submit", id);
    let (status, _) = post(&app, &submit, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = post(&app, &submit, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);

    let stored: Option<Vec<QuizResult>> = store.load(StoreKey::AllQuizResults).await.unwrap();
    assert_eq!(stored.map(|r| r.len()), Some(1));

    let (status, _) = post(&app, &submit, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
