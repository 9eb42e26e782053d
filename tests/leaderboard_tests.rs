// tests/leaderboard_tests.rs

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use lessons_backend::{
    catalog::Catalog,
    config::Config,
    models::{score_record::ScoreRecord, user::NewUser},
    routes,
    state::AppState,
    store::{MemoryStore, ResultSink, UserStore},
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "leaderboard_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        lessons_path: None,
    }
}

fn app(store: Arc<MemoryStore>) -> Router {
    let catalog = Catalog::builtin().expect("Built-in catalog must be valid");
    routes::create_router(AppState::new(store, catalog, test_config()))
}

/// Creates a user and credits them with one attempt worth `score` points.
async fn seed_user(store: &MemoryStore, name: &str, score: u32) {
    let user = store
        .create_user(NewUser {
            email: format!("{}@example.com", Uuid::new_v4()),
            display_name: name.to_string(),
            password_hash: "unused".to_string(),
        })
        .await
        .unwrap();

    if score > 0 {
        store
            .persist_attempt(&ScoreRecord {
                attempt_id: Uuid::new_v4(),
                user_id: user.id,
                lesson_id: 1,
                correct_count: score,
                total_questions: score,
                time_spent_seconds: 30,
                completed_at: Utc::now(),
            })
            .await
            .unwrap();
    }
}

async fn get_json(app: Router, uri: &str) -> Value {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn ranks_users_by_total_score() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "Low", 1).await;
    seed_user(&store, "High", 5).await;
    seed_user(&store, "Mid", 3).await;

    let board = get_json(app(store), "/api/leaderboard").await;

    assert_eq!(board["placeholder"], false);
    assert!(board["advisory"].is_null());
    let entries = board["entries"].as_array().unwrap();
    let names: Vec<&str> = entries
        .iter()
        .map(|e| e["display_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["High", "Mid", "Low"]);
    assert_eq!(entries[0]["tier"], "gold");
    assert_eq!(entries[1]["tier"], "silver");
    assert_eq!(entries[2]["tier"], "bronze");
    assert_eq!(entries[2]["rank"], 3);
}

#[tokio::test]
async fn keeps_only_top_ten() {
    let store = Arc::new(MemoryStore::new());
    for i in 1..=12 {
        seed_user(&store, &format!("Student {i}"), i).await;
    }

    let board = get_json(app(store), "/api/leaderboard").await;

    let entries = board["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 10);
    assert_eq!(entries[0]["display_name"], "Student 12");
    assert_eq!(entries[9]["display_name"], "Student 3");
    assert_eq!(entries[9]["rank"], 10);
    assert_eq!(entries[9]["tier"], "standard");
}

#[tokio::test]
async fn users_without_scores_still_rank() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "Newcomer", 0).await;

    let board = get_json(app(store), "/api/leaderboard").await;

    assert_eq!(board["placeholder"], false);
    assert_eq!(board["entries"][0]["display_name"], "Newcomer");
    assert_eq!(board["entries"][0]["total_score"], 0);
}

#[tokio::test]
async fn blank_names_render_as_anonymous() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "   ", 2).await;

    let board = get_json(app(store), "/api/leaderboard").await;

    assert_eq!(board["entries"][0]["display_name"], "Anonymous");
}

#[tokio::test]
async fn registration_notifies_subscribers() {
    let catalog = Catalog::builtin().expect("Built-in catalog must be valid");
    let state = AppState::new(Arc::new(MemoryStore::new()), catalog, test_config());
    let mut updates = state.leaderboard.subscribe();
    let app = routes::create_router(state);

    let body = serde_json::json!({
        "email": "newcomer@example.com",
        "password": "password123",
        "display_name": "Newcomer"
    });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    assert!(updates.has_changed().unwrap());
    let view = updates.borrow_and_update().clone();
    assert!(!view.placeholder);
    assert_eq!(view.entries[0].display_name, "Newcomer");
    assert_eq!(view.entries[0].total_score, 0);
    assert!(view.entries[0].created_at.is_some());
}

#[tokio::test]
async fn stream_is_served_as_event_stream() {
    let store = Arc::new(MemoryStore::new());

    let response = app(store)
        .oneshot(
            Request::builder()
                .uri("/api/leaderboard/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
}
