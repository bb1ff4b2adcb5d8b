use std::sync::Arc;

use axum::{debug_handler, extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{ledger::Ledger, oracle::{PriceFeed, Prices}, AppResult, AppState};

#[derive(Serialize)]
pub(crate) struct Stats {
    users: usize,
    messages: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/prices", get(prices))
}

#[debug_handler(state = AppState)]
pub(crate) async fn stats(State(ledger): State<Arc<Ledger>>) -> Json<Stats> {
    let (users, messages) = ledger.counts().await;
    Json(Stats { users, messages })
}

#[debug_handler(state = AppState)]
pub(crate) async fn prices(State(prices): State<Arc<PriceFeed>>) -> AppResult<Json<Prices>> {
    Ok(Json(prices.get_all_prices().await?))
}
