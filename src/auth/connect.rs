use axum::{debug_handler, extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::info;

use crate::{address::Address, ledger::Ledger, session::ADDRESS, AppResult};

#[derive(Deserialize)]
pub(crate) struct ConnectBody {
    address: Address,
}

#[derive(Serialize)]
pub(crate) struct Connected {
    address: Address,
    registered: bool,
}

/// Binds the claimed wallet address to the session.
///
/// The address is taken at face value: no signature is checked, so any client
/// can act as any address.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn connect(
    State(ledger): State<Arc<Ledger>>,
    session: Session,
    Json(ConnectBody { address }): Json<ConnectBody>,
) -> AppResult<Json<Connected>> {
    session.cycle_id().await?;
    session.insert(ADDRESS, address).await?;

    let registered = ledger.is_registered(&address).await;
    info!(%address, registered, "wallet connected");

    Ok(Json(Connected { address, registered }))
}
