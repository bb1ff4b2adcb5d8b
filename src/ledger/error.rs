use thiserror::Error;

use crate::address::Address;

use super::types::{MAX_CONTENT_CHARS, MAX_USERNAME_CHARS};

/// Every way a ledger write can be rejected. Rejections never mutate state.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0} is already registered")]
    DuplicateIdentity(Address),

    #[error("username must be 1 to {max} characters", max = MAX_USERNAME_CHARS)]
    UsernameInvalid,

    #[error("username {0:?} is already taken")]
    UsernameTaken(String),

    #[error("{0} is not registered")]
    NotRegistered(Address),

    #[error("message content must be 1 to {max} characters", max = MAX_CONTENT_CHARS)]
    ContentInvalid,

    #[error("receiver {0} is not registered")]
    UnknownCounterpart(Address),

    #[error("direct messages to yourself are disabled")]
    SelfMessage,

    #[error("write planned an event of the wrong kind")]
    UnexpectedEvent,

    #[error("ledger storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl LedgerError {
    /// Stable machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        use LedgerError::*;
        match self {
            DuplicateIdentity(_) => "duplicate_identity",
            UsernameInvalid => "username_invalid",
            UsernameTaken(_) => "username_taken",
            NotRegistered(_) => "not_registered",
            ContentInvalid => "content_invalid",
            UnknownCounterpart(_) => "unknown_counterpart",
            SelfMessage => "self_message",
            UnexpectedEvent => "unexpected_event",
            Storage(_) => "storage",
        }
    }
}
