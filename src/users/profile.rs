use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State}, Json};
use serde::Serialize;

use crate::{address::Address, appresult::Rejection, ledger::{Ledger, UserProfile}, AppResult};

#[derive(Serialize)]
pub(crate) struct Registered {
    registered: bool,
}

#[derive(Serialize)]
pub(crate) struct Username {
    available: bool,
    owner: Option<Address>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list(State(ledger): State<Arc<Ledger>>) -> Json<Vec<Address>> {
    Json(ledger.registered_addresses().await)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn profile(
    Path(address): Path<Address>,
    State(ledger): State<Arc<Ledger>>,
) -> AppResult<Json<UserProfile>> {
    let Some(profile) = ledger.profile(&address).await else {
        return Err(Rejection::NotFound("profile"))?;
    };
    Ok(Json(profile))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn registered(
    Path(address): Path<Address>,
    State(ledger): State<Arc<Ledger>>,
) -> Json<Registered> {
    Json(Registered {
        registered: ledger.is_registered(&address).await,
    })
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn conversations(
    Path(address): Path<Address>,
    State(ledger): State<Arc<Ledger>>,
) -> Json<Vec<Address>> {
    Json(ledger.conversation_partners(&address).await)
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn username(
    Path(username): Path<String>,
    State(ledger): State<Arc<Ledger>>,
) -> Json<Username> {
    let owner = ledger.resolve_username(&username).await;
    Json(Username {
        available: owner.is_none(),
        owner,
    })
}
