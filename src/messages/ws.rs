use std::sync::Arc;

use axum::{debug_handler, extract::{ws::Message as Frame, State, WebSocketUpgrade}, response::IntoResponse};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::{ledger::Ledger, session::ADDRESS, address::Address, AppResult};

#[derive(Deserialize)]
struct Outgoing {
    content: String,
}

/// Streams every committed ledger event as a JSON text frame. A connected
/// wallet may also post to the general channel by sending `{"content": ..}`.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn events_ws(
    State(ledger): State<Arc<Ledger>>,
    session: Session,
    ws: WebSocketUpgrade,
) -> AppResult<impl IntoResponse> {
    let sender_address = session.get::<Address>(ADDRESS).await?;

    Ok(ws.on_upgrade(async move |stream| {
        let mut rx = ledger.subscribe();
        let (mut sink, mut receiver) = stream.split();

        let mut broadcast_task = tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "websocket subscriber lagged behind ledger events");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Ok(json) = serde_json::to_string(&event) else {
                    continue;
                };
                if sink.send(Frame::Text(json.into())).await.is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                _ = &mut broadcast_task => break,
                frame = receiver.next() => {
                    let Some(Ok(frame)) = frame else {
                        break;
                    };
                    let (Some(sender), Frame::Text(text)) = (sender_address, frame) else {
                        continue;
                    };
                    let Ok(Outgoing { content }) = serde_json::from_str(text.as_str()) else {
                        continue;
                    };
                    if let Err(err) = ledger.post_message(sender, content).await {
                        debug!(%sender, %err, "websocket post rejected");
                    }
                }
            }
        }

        broadcast_task.abort();
    }))
}
