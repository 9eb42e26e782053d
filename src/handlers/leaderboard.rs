// src/handlers/leaderboard.rs

use std::{convert::Infallible, sync::Arc};

use axum::{
    Json,
    extract::State,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures_util::{Stream, stream};

use crate::leaderboard::LeaderboardService;

/// Retrieves the top 10 users by cumulative score.
///
/// Never fails: if storage is unavailable or empty the response carries
/// placeholder rows with `placeholder: true` and an advisory message.
pub async fn get_leaderboard(State(board): State<Arc<LeaderboardService>>) -> impl IntoResponse {
    Json(board.current().await)
}

/// Streams the leaderboard as server-sent events.
///
/// Sends the current view immediately, then one `leaderboard` event per change.
pub async fn stream_leaderboard(
    State(board): State<Arc<LeaderboardService>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = board.subscribe();
    board.refresh().await;

    let events = stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let view = rx.borrow_and_update().clone();
        let event = Event::default()
            .event("leaderboard")
            .json_data(&view)
            .unwrap_or_else(|e| {
                tracing::error!("Failed to serialize leaderboard event: {}", e);
                Event::default().comment("serialization failed")
            });
        Some((Ok(event), (rx, false)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
