// src/routes.rs

use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{attempt, auth, leaderboard, lessons},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, lessons, attempt, leaderboard).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (stores, catalog, session registry).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        // Protected auth routes
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .route("/me", get(auth::me))
                .layer(require_auth.clone()),
        );

    let me_routes = Router::new()
        .route("/attempts", get(auth::my_attempts))
        .layer(require_auth.clone());

    let lesson_routes = Router::new()
        .route("/", get(lessons::list_lessons))
        .route("/{id}", get(lessons::get_lesson))
        .merge(
            Router::new()
                .route("/{id}/attempt", post(attempt::start_attempt))
                .layer(require_auth.clone()),
        );

    let attempt_routes = Router::new()
        .route(
            "/",
            get(attempt::get_attempt).delete(attempt::abandon_attempt),
        )
        .route("/answer", post(attempt::select_answer))
        .route("/submit", post(attempt::submit_answer))
        .route("/persist", post(attempt::retry_persist))
        .layer(require_auth);

    let leaderboard_routes = Router::new()
        .route("/", get(leaderboard::get_leaderboard))
        .route("/stream", get(leaderboard::stream_leaderboard));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/me", me_routes)
        .nest("/api/lessons", lesson_routes)
        .nest("/api/attempt", attempt_routes)
        .nest("/api/leaderboard", leaderboard_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
