use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::Address;

pub const MAX_USERNAME_CHARS: usize = 50;
pub const MAX_CONTENT_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub address: Address,
    pub username: String,
    pub avatar_ref: String,
    pub is_registered: bool,
    pub registered_at: i64,
    pub messages_sent: u64,
}

/// General channel message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub sender: Address,
    pub content: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    pub sender: Address,
    pub receiver: Address,
    pub content: String,
    pub timestamp: i64,
    pub is_read: bool,
}

/// Order-independent identifier of a conversation between two addresses:
/// SHA-256 over the lower address followed by the higher one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationKey([u8; 32]);

impl ConversationKey {
    pub fn between(a: &Address, b: &Address) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let mut hasher = Sha256::new();
        hasher.update(low.as_bytes());
        hasher.update(high.as_bytes());
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Same-name rename handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameNamePolicy {
    /// Renaming to the current name succeeds and is announced.
    #[default]
    Accept,
    /// Renaming to the current name is rejected as taken.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    pub allow_self_messages: bool,
    pub same_name: SameNamePolicy,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            allow_self_messages: true,
            same_name: SameNamePolicy::Accept,
        }
    }
}

/// A state-mutating call, with the caller's address already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Register {
        address: Address,
        username: String,
        avatar_ref: String,
    },
    ChangeUsername {
        address: Address,
        username: String,
    },
    UpdateAvatar {
        address: Address,
        avatar_ref: String,
    },
    PostMessage {
        sender: Address,
        content: String,
    },
    PostDirectMessage {
        sender: Address,
        receiver: Address,
        content: String,
    },
    MarkConversationRead {
        reader: Address,
        counterpart: Address,
    },
}

/// Notification published after a write commits. Carries everything needed
/// to replay the write against storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    UserRegistered {
        address: Address,
        username: String,
        avatar_ref: String,
        timestamp: i64,
    },
    UsernameChanged {
        address: Address,
        old_username: String,
        new_username: String,
    },
    AvatarUpdated {
        address: Address,
        avatar_ref: String,
    },
    MessagePosted {
        sender: Address,
        content: String,
        timestamp: i64,
        id: u64,
    },
    DirectMessageSent {
        sender: Address,
        receiver: Address,
        content: String,
        timestamp: i64,
    },
    ConversationRead {
        reader: Address,
        counterpart: Address,
        count: usize,
    },
}

impl LedgerEvent {
    /// A write that changed nothing; neither persisted nor published.
    pub fn is_noop(&self) -> bool {
        matches!(self, LedgerEvent::ConversationRead { count: 0, .. })
    }
}

pub(crate) fn valid_username(username: &str) -> bool {
    (1..=MAX_USERNAME_CHARS).contains(&username.chars().count())
}

pub(crate) fn valid_content(content: &str) -> bool {
    (1..=MAX_CONTENT_CHARS).contains(&content.chars().count())
}
