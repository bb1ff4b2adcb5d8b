use std::sync::Arc;

use axum::{debug_handler, extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{ledger::Ledger, session, AppResult};

#[derive(Deserialize)]
pub(crate) struct UsernameBody {
    username: String,
}

#[derive(Deserialize)]
pub(crate) struct AvatarBody {
    avatar_ref: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn change_username(
    State(ledger): State<Arc<Ledger>>,
    session: Session,
    Json(UsernameBody { username }): Json<UsernameBody>,
) -> AppResult<StatusCode> {
    let address = session::connected(&session).await?;
    ledger.change_username(address, username).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn update_avatar(
    State(ledger): State<Arc<Ledger>>,
    session: Session,
    Json(AvatarBody { avatar_ref }): Json<AvatarBody>,
) -> AppResult<StatusCode> {
    let address = session::connected(&session).await?;
    ledger.update_avatar(address, avatar_ref).await?;
    Ok(StatusCode::NO_CONTENT)
}
