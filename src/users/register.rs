use std::sync::Arc;

use axum::{debug_handler, extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::info;

use crate::{ledger::{Ledger, UserProfile}, session, AppResult};

#[derive(Deserialize)]
pub(crate) struct RegisterBody {
    username: String,
    #[serde(default)]
    avatar_ref: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn register(
    State(ledger): State<Arc<Ledger>>,
    session: Session,
    Json(RegisterBody { username, avatar_ref }): Json<RegisterBody>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    let address = session::connected(&session).await?;

    let profile = ledger.register(address, username, avatar_ref).await?;
    info!(%address, username = %profile.username, "user registered");

    Ok((StatusCode::CREATED, Json(profile)))
}
