// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    leaderboard::LeaderboardService,
    models::user::{CreateUserRequest, LoginRequest, NewUser, normalize_email},
    sessions::SessionRegistry,
    store::UserStore,
    utils::{
        hash::{hash_password, verify_password},
        html::validate_display_name,
        jwt::{Claims, sign_jwt},
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(users): State<Arc<dyn UserStore>>,
    State(board): State<Arc<LeaderboardService>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let display_name = validate_display_name(&payload.display_name)?;

    let hashed_password = hash_password(&payload.password)?;

    let user = users
        .create_user(NewUser {
            email: normalize_email(&payload.email),
            display_name,
            password_hash: hashed_password,
        })
        .await?;

    tracing::info!(user_id = user.id, "User registered");

    // A new user can enter the top 10 at zero points.
    board.refresh().await;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the email and password against the user store.
/// If valid, signs a JWT token with the user's ID and display name.
pub async fn login(
    State(users): State<Arc<dyn UserStore>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = users
        .find_by_email(&normalize_email(&payload.email))
        .await?
        .ok_or(AppError::AuthError("Invalid email or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid email or password".to_string()));
    }

    let token = sign_jwt(
        user.id,
        &user.display_name,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": user
    })))
}

/// Signs the user out.
///
/// Tokens are stateless, so the client discards its token; server-side the
/// user's unfinished quiz session is abandoned without a record. A completed
/// result that still cannot be saved is kept so it can be retried after the
/// next login.
pub async fn logout(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    if let Err(e) = sessions.abandon(user_id).await {
        tracing::warn!(user_id, "Keeping quiz session on logout: {}", e);
    }
    tracing::info!(user_id, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the signed-in user's profile, including the cumulative score.
pub async fn me(
    State(users): State<Arc<dyn UserStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = users
        .find_by_id(claims.user_id()?)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Lists the signed-in user's recorded attempts, newest first.
pub async fn my_attempts(
    State(users): State<Arc<dyn UserStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = users.attempts_for_user(claims.user_id()?).await?;
    Ok(Json(attempts))
}
