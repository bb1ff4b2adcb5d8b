//! Registry & messaging ledger.
//!
//! [`Ledger`] wraps the [`LedgerState`] aggregate in a `RwLock` and serializes
//! writers on a separate mutex. A write holds the mutex while it is planned,
//! persisted through [`Store`] and applied, so writes are all-or-nothing.
//! The state lock is only taken exclusively for the in-memory apply, so reads
//! never wait on SQLite. Committed events go out on a broadcast channel in
//! commit order.

mod error;
mod state;
mod store;
mod types;

pub use error::LedgerError;
pub use state::LedgerState;
pub use store::Store;
pub use types::{
    ConversationKey, DirectMessage, LedgerEvent, LedgerPolicy, Message, SameNamePolicy,
    UserProfile, Write, MAX_CONTENT_CHARS, MAX_USERNAME_CHARS,
};

use sqlx::SqlitePool;
use time::OffsetDateTime;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info};

use crate::address::Address;

pub struct Ledger {
    state: RwLock<LedgerState>,
    writer: Mutex<()>,
    store: Store,
    tx: broadcast::Sender<LedgerEvent>,
}

impl Ledger {
    /// Opens the ledger on `db_pool`, creating the schema and restoring
    /// whatever was committed before.
    pub async fn open(db_pool: SqlitePool, policy: LedgerPolicy, event_capacity: usize) -> Result<Self, LedgerError> {
        let store = Store::new(db_pool);
        store.migrate().await?;
        let state = store.load(policy).await?;
        info!(
            users = state.user_count(),
            messages = state.message_count(),
            "ledger restored"
        );

        Ok(Self {
            state: RwLock::new(state),
            writer: Mutex::new(()),
            store,
            tx: broadcast::channel(event_capacity.max(1)).0,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }

    pub async fn execute(&self, write: Write) -> Result<LedgerEvent, LedgerError> {
        let _writer = self.writer.lock().await;

        let event = self.state.read().await.plan(&write, now()).inspect_err(|err| {
            debug!(kind = err.kind(), %err, "ledger write rejected");
        })?;
        if event.is_noop() {
            return Ok(event);
        }

        self.store.persist(&event).await?;
        self.state.write().await.apply(&event);
        // no subscribers is fine
        let _ = self.tx.send(event.clone());

        Ok(event)
    }

    pub async fn register(&self, address: Address, username: String, avatar_ref: String) -> Result<UserProfile, LedgerError> {
        self.execute(Write::Register { address, username, avatar_ref }).await?;
        self.profile(&address)
            .await
            .ok_or(LedgerError::NotRegistered(address))
    }

    pub async fn change_username(&self, address: Address, username: String) -> Result<(), LedgerError> {
        self.execute(Write::ChangeUsername { address, username }).await?;
        Ok(())
    }

    pub async fn update_avatar(&self, address: Address, avatar_ref: String) -> Result<(), LedgerError> {
        self.execute(Write::UpdateAvatar { address, avatar_ref }).await?;
        Ok(())
    }

    /// Appends to the general channel and returns the new message id.
    pub async fn post_message(&self, sender: Address, content: String) -> Result<u64, LedgerError> {
        let LedgerEvent::MessagePosted { id, .. } = self.execute(Write::PostMessage { sender, content }).await? else {
            return Err(LedgerError::UnexpectedEvent);
        };
        Ok(id)
    }

    pub async fn post_direct_message(&self, sender: Address, receiver: Address, content: String) -> Result<(), LedgerError> {
        self.execute(Write::PostDirectMessage { sender, receiver, content }).await?;
        Ok(())
    }

    /// Marks everything `reader` received from `counterpart` as read and
    /// returns how many messages changed.
    pub async fn mark_conversation_read(&self, reader: Address, counterpart: Address) -> Result<usize, LedgerError> {
        let LedgerEvent::ConversationRead { count, .. } =
            self.execute(Write::MarkConversationRead { reader, counterpart }).await?
        else {
            return Err(LedgerError::UnexpectedEvent);
        };
        Ok(count)
    }

    pub async fn is_username_available(&self, username: &str) -> bool {
        self.state.read().await.is_username_available(username)
    }

    pub async fn resolve_username(&self, username: &str) -> Option<Address> {
        self.state.read().await.resolve_username(username)
    }

    pub async fn is_registered(&self, address: &Address) -> bool {
        self.state.read().await.is_registered(address)
    }

    pub async fn profile(&self, address: &Address) -> Option<UserProfile> {
        self.state.read().await.profile(address).cloned()
    }

    pub async fn registered_addresses(&self) -> Vec<Address> {
        self.state.read().await.registered_addresses().to_vec()
    }

    pub async fn general_messages(&self) -> Vec<Message> {
        self.state.read().await.general_messages().to_vec()
    }

    pub async fn recent_messages(&self, limit: usize) -> Vec<Message> {
        self.state.read().await.recent_messages(limit).to_vec()
    }

    pub async fn conversation(&self, a: &Address, b: &Address) -> Vec<DirectMessage> {
        self.state.read().await.conversation(a, b).to_vec()
    }

    pub async fn conversation_partners(&self, address: &Address) -> Vec<Address> {
        self.state.read().await.conversation_partners(address).to_vec()
    }

    pub async fn counts(&self) -> (usize, usize) {
        let state = self.state.read().await;
        (state.user_count(), state.message_count())
    }
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
