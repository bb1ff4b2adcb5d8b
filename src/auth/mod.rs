//! Wallet sessions. The wallet itself proves ownership of the address; the
//! server only remembers which address this browser session speaks for.

mod connect;
mod disconnect;

use axum::{routing::post, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/connect", post(connect::connect))
        .route("/disconnect", post(disconnect::disconnect))
}
