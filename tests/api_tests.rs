// tests/api_tests.rs

use std::{sync::Arc, time::Duration};

use lessons_backend::{
    catalog::Catalog, config::Config, routes, state::AppState, store::MemoryStore,
};
use serde_json::Value;

/// One short lesson with a known answer key: 0, 1, 2.
const TEST_LESSONS: &str = r#"[
  {
    "id": 7,
    "title": "Test lesson",
    "time_limit_seconds": 120,
    "questions": [
      { "prompt": "First?", "options": ["a", "b", "c"], "correct_index": 0 },
      { "prompt": "Second?", "options": ["a", "b", "c"], "correct_index": 1 },
      { "prompt": "Third?", "options": ["a", "b", "c"], "correct_index": 2 }
    ]
  }
]"#;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    let config = Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        lessons_path: None,
    };

    let catalog = Catalog::from_json(TEST_LESSONS).expect("Test catalog must be valid");
    let state = AppState::new(Arc::new(MemoryStore::new()), catalog, config);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

/// Registers a fresh user and returns a bearer token for them.
async fn register_and_login(client: &reqwest::Client, address: &str, display_name: &str) -> String {
    let email = format!("{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    let register = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "email": email,
            "password": password,
            "display_name": display_name
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(register.status().as_u16(), 201);

    let login: Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    login["token"].as_str().expect("Token not found").to_string()
}

async fn select_and_submit(client: &reqwest::Client, address: &str, token: &str, option: usize) -> Value {
    let select = client
        .post(format!("{}/api/attempt/answer", address))
        .bearer_auth(token)
        .json(&serde_json::json!({ "option_index": option }))
        .send()
        .await
        .expect("Select failed");
    assert_eq!(select.status().as_u16(), 200);

    let submit = client
        .post(format!("{}/api/attempt/submit", address))
        .bearer_auth(token)
        .send()
        .await
        .expect("Submit failed");
    assert_eq!(submit.status().as_u16(), 200);
    submit.json().await.unwrap()
}

/// Polls the attempt until its result has left the `pending` state.
async fn wait_for_persistence(client: &reqwest::Client, address: &str, token: &str) -> Value {
    for _ in 0..100 {
        let view: Value = client
            .get(format!("{}/api/attempt", address))
            .bearer_auth(token)
            .send()
            .await
            .expect("Fetch attempt failed")
            .json()
            .await
            .unwrap();
        if view["persistence"]["state"] != "pending" {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Quiz result was never persisted");
}

#[tokio::test]
async fn unknown_path_404() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "email": "Amina@Example.com",
            "password": "password123",
            "display_name": "Amina"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["email"], "amina@example.com");
    assert_eq!(user["total_score"], 0);
    assert!(user.get("password").is_none());
}

#[tokio::test]
async fn register_fails_validation() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "email": "not-an-email",
            "password": "password123",
            "display_name": "Yusuf"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn register_keeps_display_name_verbatim() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "email": "tom@example.com",
            "password": "password123",
            "display_name": "  Tom & Jerry "
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["display_name"], "Tom & Jerry");
}

#[tokio::test]
async fn register_rejects_markup_in_display_name() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    for name in ["<b>Yusuf</b>", "a<b"] {
        let response = client
            .post(format!("{}/api/auth/register", address))
            .json(&serde_json::json!({
                "email": format!("{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]),
                "password": "password123",
                "display_name": name
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400, "name {name:?}");
    }
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let body = serde_json::json!({
        "email": "dup@example.com",
        "password": "password123",
        "display_name": "Dup"
    });

    let first = client
        .post(format!("{}/api/auth/register", address))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 201);

    let second = client
        .post(format!("{}/api/auth/register", address))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "email": "omar@example.com",
            "password": "password123",
            "display_name": "Omar"
        }))
        .send()
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": "omar@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn protected_routes_require_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let start = client
        .post(format!("{}/api/lessons/7/attempt", address))
        .send()
        .await
        .unwrap();
    assert_eq!(start.status().as_u16(), 401);

    let me = client
        .get(format!("{}/api/auth/me", address))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(me.status().as_u16(), 401);
}

#[tokio::test]
async fn lessons_are_listed_without_answers() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let list: Value = client
        .get(format!("{}/api/lessons", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], 7);

    let detail = client
        .get(format!("{}/api/lessons/7", address))
        .send()
        .await
        .unwrap();
    assert_eq!(detail.status().as_u16(), 200);
    let body = detail.text().await.unwrap();
    assert!(!body.contains("correct_index"));

    let missing = client
        .get(format!("{}/api/lessons/99", address))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn test_quiz_flow() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address, "Fatima").await;

    // 1. Start the lesson
    let start = client
        .post(format!("{}/api/lessons/7/attempt", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Start failed");
    assert_eq!(start.status().as_u16(), 201);
    let view: Value = start.json().await.unwrap();
    assert_eq!(view["status"], "in_progress");
    assert_eq!(view["question_index"], 0);
    assert_eq!(view["question_count"], 3);
    assert_eq!(view["remaining_seconds"], 120);

    // 2. Answer: right, wrong, right
    let view = select_and_submit(&client, &address, &token, 0).await;
    assert_eq!(view["question_index"], 1);
    assert_eq!(view["correct_count"], 1);
    select_and_submit(&client, &address, &token, 0).await;
    let view = select_and_submit(&client, &address, &token, 2).await;

    assert_eq!(view["status"], "completed");
    assert!(view["question"].is_null());
    assert_eq!(view["result"]["record"]["correct_count"], 2);
    assert_eq!(view["result"]["record"]["total_questions"], 3);
    assert_eq!(view["result"]["percentage"], 67);
    assert_eq!(view["result"]["passed"], false);

    // 3. The result reaches the store
    let view = wait_for_persistence(&client, &address, &token).await;
    assert_eq!(view["persistence"]["state"], "persisted");

    // 4. Profile, history and leaderboard reflect the attempt
    let me: Value = client
        .get(format!("{}/api/auth/me", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["total_score"], 2);

    let attempts: Value = client
        .get(format!("{}/api/me/attempts", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(attempts.as_array().unwrap().len(), 1);
    assert_eq!(attempts[0]["lesson_id"], 7);

    let board: Value = client
        .get(format!("{}/api/leaderboard", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(board["placeholder"], false);
    assert_eq!(board["entries"][0]["display_name"], "Fatima");
    assert_eq!(board["entries"][0]["total_score"], 2);
    assert_eq!(board["entries"][0]["tier"], "gold");
    assert!(board["entries"][0]["created_at"].is_string());

    // 5. A saved result cannot be sent again
    let retry = client
        .post(format!("{}/api/attempt/persist", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(retry.status().as_u16(), 409);
}

#[tokio::test]
async fn submit_without_selection_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address, "Bilal").await;

    client
        .post(format!("{}/api/lessons/7/attempt", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let submit = client
        .post(format!("{}/api/attempt/submit", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(submit.status().as_u16(), 409);

    let out_of_range = client
        .post(format!("{}/api/attempt/answer", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "option_index": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(out_of_range.status().as_u16(), 400);

    // Neither error moved the session
    let view: Value = client
        .get(format!("{}/api/attempt", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["question_index"], 0);
    assert!(view["pending_answer"].is_null());
}

#[tokio::test]
async fn leaderboard_shows_placeholder_when_empty() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/leaderboard", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let board: Value = response.json().await.unwrap();
    assert_eq!(board["placeholder"], true);
    assert!(board["advisory"].is_string());
    assert_eq!(board["entries"].as_array().unwrap().len(), 5);
    assert_eq!(board["entries"][0]["rank"], 1);
    assert!(board["entries"][0]["created_at"].is_null());
}

#[tokio::test]
async fn logout_abandons_attempt() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address, "Khadija").await;

    client
        .post(format!("{}/api/lessons/7/attempt", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    select_and_submit(&client, &address, &token, 0).await;

    let logout = client
        .post(format!("{}/api/auth/logout", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(logout.status().as_u16(), 204);

    let attempt = client
        .get(format!("{}/api/attempt", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(attempt.status().as_u16(), 404);

    // Nothing was recorded for the unfinished attempt
    let attempts: Value = client
        .get(format!("{}/api/me/attempts", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(attempts.as_array().unwrap().is_empty());
}
