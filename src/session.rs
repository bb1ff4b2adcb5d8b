use tower_sessions::Session;

use crate::{address::Address, appresult::Rejection, AppResult};

/// Wallet address the client connected with.
pub const ADDRESS: &str = "address";

/// Address of the connected wallet, or 401 when none is connected.
pub async fn connected(session: &Session) -> AppResult<Address> {
    Ok(session
        .get::<Address>(ADDRESS)
        .await?
        .ok_or(Rejection::NotConnected)?)
}
