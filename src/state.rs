use crate::config::AppConfig;
use crate::users::{
    credential::TokenIssuer,
    memory::MemoryUserStore,
    repo::{PgUserStore, UserStore},
    services::UserService,
};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<UserService>,
}

impl AppState {
    /// Wires the service around an already constructed store.
    pub fn from_parts(config: AppConfig, store: Arc<dyn UserStore>) -> Self {
        let tokens = TokenIssuer::new(&config.jwt);
        Self {
            users: Arc::new(UserService::new(store, tokens)),
            config: Arc::new(config),
        }
    }

    pub fn postgres(config: AppConfig, db: PgPool) -> Self {
        Self::from_parts(config, Arc::new(PgUserStore::new(db)))
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_parts(config, Arc::new(MemoryUserStore::new()))
    }
}
