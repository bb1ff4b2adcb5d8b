use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::address::Address;

use super::{
    state::LedgerState,
    types::{ConversationKey, DirectMessage, LedgerEvent, LedgerPolicy, Message, UserProfile},
};

/// SQLite write-through storage behind the in-memory ledger.
#[derive(Clone)]
pub struct Store {
    db_pool: SqlitePool,
}

impl Store {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Creates the schema if it is missing. Safe to run on every start.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                seq             INTEGER PRIMARY KEY AUTOINCREMENT,
                address         TEXT NOT NULL UNIQUE,
                username        TEXT NOT NULL UNIQUE,
                avatar_ref      TEXT NOT NULL,
                registered_at   INTEGER NOT NULL,
                messages_sent   INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS messages (
                id              INTEGER PRIMARY KEY,
                sender          TEXT NOT NULL,
                content         TEXT NOT NULL,
                timestamp       INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS direct_messages (
                seq             INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation    TEXT NOT NULL,
                sender          TEXT NOT NULL,
                receiver        TEXT NOT NULL,
                content         TEXT NOT NULL,
                timestamp       INTEGER NOT NULL,
                is_read         INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS direct_messages_by_conversation
                ON direct_messages (conversation, seq);

            CREATE TABLE IF NOT EXISTS conversation_partners (
                seq             INTEGER PRIMARY KEY AUTOINCREMENT,
                address         TEXT NOT NULL,
                partner         TEXT NOT NULL,
                UNIQUE (address, partner)
            );
            "#,
        )
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    /// Rebuilds the aggregate from the tables, preserving every insertion order.
    pub async fn load(&self, policy: LedgerPolicy) -> Result<LedgerState, sqlx::Error> {
        let mut state = LedgerState::new(policy);

        let profiles: Vec<(String, String, String, i64, i64)> = sqlx::query_as(
            "SELECT address,username,avatar_ref,registered_at,messages_sent FROM profiles ORDER BY seq",
        )
        .fetch_all(&self.db_pool)
        .await?;
        for (address, username, avatar_ref, registered_at, messages_sent) in profiles {
            state.restore_profile(UserProfile {
                address: parse_address(&address)?,
                username,
                avatar_ref,
                is_registered: true,
                registered_at,
                messages_sent: messages_sent as u64,
            });
        }

        let messages: Vec<(i64, String, String, i64)> =
            sqlx::query_as("SELECT id,sender,content,timestamp FROM messages ORDER BY id")
                .fetch_all(&self.db_pool)
                .await?;
        for (id, sender, content, timestamp) in messages {
            state.restore_message(Message {
                id: id as u64,
                sender: parse_address(&sender)?,
                content,
                timestamp,
            });
        }

        let dms: Vec<(String, String, String, i64, bool)> = sqlx::query_as(
            "SELECT sender,receiver,content,timestamp,is_read FROM direct_messages ORDER BY seq",
        )
        .fetch_all(&self.db_pool)
        .await?;
        for (sender, receiver, content, timestamp, is_read) in dms {
            state.restore_direct_message(DirectMessage {
                sender: parse_address(&sender)?,
                receiver: parse_address(&receiver)?,
                content,
                timestamp,
                is_read,
            });
        }

        let partners: Vec<(String, String)> =
            sqlx::query_as("SELECT address,partner FROM conversation_partners ORDER BY seq")
                .fetch_all(&self.db_pool)
                .await?;
        for (address, partner) in partners {
            state.restore_partner(parse_address(&address)?, parse_address(&partner)?);
        }

        Ok(state)
    }

    /// Writes one committed event in a single transaction.
    pub async fn persist(&self, event: &LedgerEvent) -> Result<(), sqlx::Error> {
        let mut tx = self.db_pool.begin().await?;
        write_event(&mut tx, event).await?;
        tx.commit().await?;
        debug!(?event, "ledger event persisted");
        Ok(())
    }
}

async fn write_event(tx: &mut Transaction<'_, Sqlite>, event: &LedgerEvent) -> Result<(), sqlx::Error> {
    match event {
        LedgerEvent::UserRegistered { address, username, avatar_ref, timestamp } => {
            sqlx::query("INSERT INTO profiles (address,username,avatar_ref,registered_at) VALUES (?,?,?,?)")
                .bind(address.to_string())
                .bind(username)
                .bind(avatar_ref)
                .bind(timestamp)
                .execute(&mut **tx)
                .await?;
        }

        LedgerEvent::UsernameChanged { address, new_username, .. } => {
            sqlx::query("UPDATE profiles SET username=? WHERE address=?")
                .bind(new_username)
                .bind(address.to_string())
                .execute(&mut **tx)
                .await?;
        }

        LedgerEvent::AvatarUpdated { address, avatar_ref } => {
            sqlx::query("UPDATE profiles SET avatar_ref=? WHERE address=?")
                .bind(avatar_ref)
                .bind(address.to_string())
                .execute(&mut **tx)
                .await?;
        }

        LedgerEvent::MessagePosted { sender, content, timestamp, id } => {
            sqlx::query("INSERT INTO messages (id,sender,content,timestamp) VALUES (?,?,?,?)")
                .bind(*id as i64)
                .bind(sender.to_string())
                .bind(content)
                .bind(timestamp)
                .execute(&mut **tx)
                .await?;
            sqlx::query("UPDATE profiles SET messages_sent=messages_sent+1 WHERE address=?")
                .bind(sender.to_string())
                .execute(&mut **tx)
                .await?;
        }

        LedgerEvent::DirectMessageSent { sender, receiver, content, timestamp } => {
            sqlx::query("INSERT INTO direct_messages (conversation,sender,receiver,content,timestamp) VALUES (?,?,?,?,?)")
                .bind(ConversationKey::between(sender, receiver).to_string())
                .bind(sender.to_string())
                .bind(receiver.to_string())
                .bind(content)
                .bind(timestamp)
                .execute(&mut **tx)
                .await?;
            for (address, partner) in [(sender, receiver), (receiver, sender)] {
                sqlx::query("INSERT OR IGNORE INTO conversation_partners (address,partner) VALUES (?,?)")
                    .bind(address.to_string())
                    .bind(partner.to_string())
                    .execute(&mut **tx)
                    .await?;
            }
        }

        LedgerEvent::ConversationRead { reader, counterpart, .. } => {
            sqlx::query("UPDATE direct_messages SET is_read=1 WHERE conversation=? AND receiver=?")
                .bind(ConversationKey::between(reader, counterpart).to_string())
                .bind(reader.to_string())
                .execute(&mut **tx)
                .await?;
        }
    }
    Ok(())
}

fn parse_address(raw: &str) -> Result<Address, sqlx::Error> {
    raw.parse().map_err(|err| sqlx::Error::Decode(Box::new(err)))
}
