mod me;
mod profile;
mod register;

use axum::{routing::{get, put}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(profile::list).post(register::register))
        .route("/users/{address}", get(profile::profile))
        .route("/users/{address}/registered", get(profile::registered))
        .route("/users/{address}/conversations", get(profile::conversations))
        .route("/usernames/{username}", get(profile::username))
        .route("/me/username", put(me::change_username))
        .route("/me/avatar", put(me::update_avatar))
}
