// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    catalog::Catalog,
    config::{Config, LEADERBOARD_SIZE},
    leaderboard::LeaderboardService,
    sessions::SessionRegistry,
    store::{LeaderboardSource, ResultSink, UserStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserStore>,
    pub catalog: Arc<Catalog>,
    pub sessions: SessionRegistry,
    pub leaderboard: Arc<LeaderboardService>,
}

impl AppState {
    /// Wires every collaborator to one backing store.
    pub fn new<S>(store: Arc<S>, catalog: Catalog, config: Config) -> Self
    where
        S: UserStore + ResultSink + LeaderboardSource + 'static,
    {
        let leaderboard = Arc::new(LeaderboardService::new(store.clone(), LEADERBOARD_SIZE));
        let sessions = SessionRegistry::new(store.clone(), leaderboard.clone());

        Self {
            config,
            users: store,
            catalog: Arc::new(catalog),
            sessions,
            leaderboard,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn UserStore> {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for Arc<Catalog> {
    fn from_ref(state: &AppState) -> Self {
        state.catalog.clone()
    }
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<LeaderboardService> {
    fn from_ref(state: &AppState) -> Self {
        state.leaderboard.clone()
    }
}
