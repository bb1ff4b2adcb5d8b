use std::sync::Arc;

use axum::{debug_handler, extract::{Query, State}, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{ledger::{Ledger, Message}, session, AppResult};

#[derive(Deserialize)]
pub(crate) struct MessagesQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
pub(crate) struct PostMessageBody {
    content: String,
}

#[derive(Serialize)]
pub(crate) struct Posted {
    id: u64,
}

/// Full general-channel history, or only the last `limit` messages.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn messages(
    State(ledger): State<Arc<Ledger>>,
    Query(MessagesQuery { limit }): Query<MessagesQuery>,
) -> Json<Vec<Message>> {
    Json(match limit {
        Some(limit) => ledger.recent_messages(limit).await,
        None => ledger.general_messages().await,
    })
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn post_message(
    State(ledger): State<Arc<Ledger>>,
    session: Session,
    Json(PostMessageBody { content }): Json<PostMessageBody>,
) -> AppResult<(StatusCode, Json<Posted>)> {
    let sender = session::connected(&session).await?;
    let id = ledger.post_message(sender, content).await?;
    Ok((StatusCode::CREATED, Json(Posted { id })))
}
