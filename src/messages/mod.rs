mod direct;
mod general;
mod ws;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", get(general::messages).post(general::post_message))
        // matchit requires one param name per path position
        .route("/dm/{a}", post(direct::post_direct_message))
        .route("/dm/{a}/{b}", get(direct::conversation))
        .route("/dm/{a}/read", post(direct::mark_read))
        .route("/ws", get(ws::events_ws))
}
