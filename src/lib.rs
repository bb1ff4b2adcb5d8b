pub mod address;
pub mod appresult;
pub mod auth;
pub mod config;
pub mod index;
pub mod ledger;
pub mod messages;
pub mod oracle;
pub mod session;
pub mod users;

use std::sync::Arc;

use axum::{extract::FromRef, Router};
use tower_http::cors::CorsLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

pub use appresult::{AppError, AppResult};

use ledger::Ledger;
use oracle::PriceFeed;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub prices: Arc<PriceFeed>,
}

/// Full HTTP surface with sessions and CORS for the web client.
pub fn app(app_state: AppState, session_idle: time::Duration) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(session_idle));

    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(messages::router())
        .merge(index::router())
        .with_state(app_state)
        .layer(session_layer)
        .layer(CorsLayer::very_permissive())
}
