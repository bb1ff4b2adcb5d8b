use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State}, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{address::Address, ledger::{DirectMessage, Ledger}, session, AppResult};

#[derive(Deserialize)]
pub(crate) struct DirectMessageBody {
    content: String,
}

#[derive(Serialize)]
pub(crate) struct MarkedRead {
    count: usize,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn conversation(
    Path((a, b)): Path<(Address, Address)>,
    State(ledger): State<Arc<Ledger>>,
) -> Json<Vec<DirectMessage>> {
    Json(ledger.conversation(&a, &b).await)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn post_direct_message(
    Path(receiver): Path<Address>,
    State(ledger): State<Arc<Ledger>>,
    session: Session,
    Json(DirectMessageBody { content }): Json<DirectMessageBody>,
) -> AppResult<StatusCode> {
    let sender = session::connected(&session).await?;
    ledger.post_direct_message(sender, receiver, content).await?;
    Ok(StatusCode::CREATED)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn mark_read(
    Path(counterpart): Path<Address>,
    State(ledger): State<Arc<Ledger>>,
    session: Session,
) -> AppResult<Json<MarkedRead>> {
    let reader = session::connected(&session).await?;
    let count = ledger.mark_conversation_read(reader, counterpart).await?;
    Ok(Json(MarkedRead { count }))
}
