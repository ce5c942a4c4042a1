pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod present;
pub mod routes;
pub mod state;
pub mod store;
pub mod validate;

use std::sync::Arc;

/// Picks the store: sqlite when configured and reachable, memory otherwise.
pub async fn build_state(config: &config::Config) -> state::AppState {
    if let Some(url) = config.database_url.as_deref() {
        match store::SqliteStore::connect(url, config.db_max_connections).await {
            Ok(store) => {
                tracing::info!("sqlite connected and migrations applied");
                return state::AppState::new(Arc::new(store));
            }
            Err(err) => tracing::warn!(
                "sqlite is unavailable ({}), backend continues in local in-memory mode",
                err
            ),
        }
    }
    state::AppState::in_memory()
}
