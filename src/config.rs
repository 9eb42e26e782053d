// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Number of rows on the leaderboard.
pub const LEADERBOARD_SIZE: usize = 10;

/// Minimum percentage that counts as passing a lesson.
pub const PASSING_SCORE_PERCENTAGE: u32 = 70;

/// How often the background ticker advances running sessions.
pub const TICK_INTERVAL_SECS: u64 = 1;

/// How long a completed session stays readable (and retryable) before eviction.
pub const SESSION_RETENTION_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    /// JSON lesson catalog overriding the built-in one.
    pub lessons_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let lessons_path = env::var("LESSONS_PATH").ok().filter(|s| !s.is_empty());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            lessons_path,
        }
    }
}
