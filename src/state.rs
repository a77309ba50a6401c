// src/state.rs

use std::time::Duration;

use axum::extract::FromRef;

use crate::{
    config::Config,
    error::AppError,
    quiz::{intent::IntentBook, session::SessionBook},
    store::Store,
    utils::hash::AdminCredentials,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Config,
    pub admin: AdminCredentials,
    pub sessions: SessionBook,
    pub intents: IntentBook,
}

impl AppState {
    pub fn new(store: Store, config: Config) -> Result<Self, AppError> {
        let admin = AdminCredentials::new(&config.admin_username, &config.admin_password)?;
        let intents = IntentBook::new(Duration::from_secs(config.intent_ttl_secs));
        let sessions = SessionBook::new(Duration::from_secs(config.session_ttl_secs));

        Ok(Self {
            store,
            config,
            admin,
            sessions,
            intents,
        })
    }
}

impl FromRef<AppState> for Store {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SessionBook {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for IntentBook {
    fn from_ref(state: &AppState) -> Self {
        state.intents.clone()
    }
}
