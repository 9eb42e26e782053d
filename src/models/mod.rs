// src/models/mod.rs

pub mod leaderboard;
pub mod lesson;
pub mod score_record;
pub mod user;
