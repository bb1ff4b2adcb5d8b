use axum::{debug_handler, http::StatusCode};
use tower_sessions::Session;

use crate::AppResult;

#[debug_handler]
pub(crate) async fn disconnect(session: Session) -> AppResult<StatusCode> {
    session.flush().await?;
    Ok(StatusCode::NO_CONTENT)
}
