use chainchat::{
    address::{Address, ADDRESS_LEN},
    ledger::{Ledger, LedgerError, LedgerEvent, LedgerPolicy, SameNamePolicy},
};
use std::{sync::Arc, time::Duration};

use sqlx::{sqlite::SqlitePoolOptions, Connection, SqliteConnection, SqlitePool};
use time::OffsetDateTime;

fn addr(n: u8) -> Address {
    Address::from_bytes([n; ADDRESS_LEN])
}

async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

async fn open(policy: LedgerPolicy) -> Ledger {
    Ledger::open(memory_pool().await, policy, 64).await.unwrap()
}

#[tokio::test]
async fn alice_and_bob_scenario() {
    let ledger = open(LedgerPolicy::default()).await;

    ledger.register(addr(1), "alice".into(), "ref1".into()).await.unwrap();
    assert!(!ledger.is_username_available("alice").await);

    let err = ledger.register(addr(2), "alice".into(), "ref2".into()).await.unwrap_err();
    assert!(matches!(err, LedgerError::UsernameTaken(_)));
    ledger.register(addr(2), "bob".into(), "ref2".into()).await.unwrap();

    assert_eq!(ledger.post_message(addr(1), "hi".into()).await.unwrap(), 0);
    assert_eq!(ledger.post_message(addr(2), "hello".into()).await.unwrap(), 1);

    let messages = ledger.general_messages().await;
    let mut summary = Vec::new();
    for m in &messages {
        let name = ledger.profile(&m.sender).await.unwrap().username;
        summary.push((name, m.content.as_str(), m.id));
    }
    assert_eq!(summary, vec![
        ("alice".to_owned(), "hi", 0),
        ("bob".to_owned(), "hello", 1),
    ]);
    assert_eq!(ledger.counts().await, (2, 2));
}

#[tokio::test]
async fn events_follow_commits() {
    let ledger = open(LedgerPolicy::default()).await;
    let mut rx = ledger.subscribe();
    let before = OffsetDateTime::now_utc().unix_timestamp();

    ledger.register(addr(1), "alice".into(), "Qm".into()).await.unwrap();
    // rejected writes publish nothing
    assert!(ledger.register(addr(1), "again".into(), "Qm".into()).await.is_err());
    assert!(ledger.post_message(addr(1), "x".repeat(1001)).await.is_err());
    ledger.post_message(addr(1), "gm".into()).await.unwrap();
    ledger.change_username(addr(1), "alicia".into()).await.unwrap();
    ledger.update_avatar(addr(1), "Qm2".into()).await.unwrap();
    ledger.register(addr(2), "bob".into(), "Qm".into()).await.unwrap();
    assert!(ledger.post_direct_message(addr(1), addr(3), "nobody".into()).await.is_err());
    ledger.post_direct_message(addr(1), addr(2), "psst".into()).await.unwrap();
    // nothing unread yet for alice
    assert_eq!(ledger.mark_conversation_read(addr(1), addr(2)).await.unwrap(), 0);
    assert_eq!(ledger.mark_conversation_read(addr(2), addr(1)).await.unwrap(), 1);

    assert!(matches!(rx.recv().await.unwrap(), LedgerEvent::UserRegistered { username, .. } if username == "alice"));
    assert!(matches!(rx.recv().await.unwrap(), LedgerEvent::MessagePosted { id: 0, .. }));
    assert_eq!(rx.recv().await.unwrap(), LedgerEvent::UsernameChanged {
        address: addr(1),
        old_username: "alice".to_owned(),
        new_username: "alicia".to_owned(),
    });
    assert_eq!(rx.recv().await.unwrap(), LedgerEvent::AvatarUpdated {
        address: addr(1),
        avatar_ref: "Qm2".to_owned(),
    });
    assert!(matches!(rx.recv().await.unwrap(), LedgerEvent::UserRegistered { username, .. } if username == "bob"));
    match rx.recv().await.unwrap() {
        LedgerEvent::DirectMessageSent { sender, receiver, content, timestamp } => {
            assert_eq!((sender, receiver, content.as_str()), (addr(1), addr(2), "psst"));
            assert!(timestamp >= before);
        }
        other => panic!("expected a direct message, got {other:?}"),
    }
    assert_eq!(rx.recv().await.unwrap(), LedgerEvent::ConversationRead {
        reader: addr(2),
        counterpart: addr(1),
        count: 1,
    });
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn reads_proceed_while_a_write_waits_on_storage() {
    let path = std::env::temp_dir().join(format!(
        "chainchat-{}-{}.db",
        std::process::id(),
        OffsetDateTime::now_utc().unix_timestamp_nanos()
    ));
    let url = format!("sqlite://{}?mode=rwc", path.display());

    let db_pool = SqlitePoolOptions::new().connect(&url).await.unwrap();
    let ledger = Arc::new(Ledger::open(db_pool, LedgerPolicy::default(), 8).await.unwrap());
    ledger.register(addr(1), "alice".into(), String::new()).await.unwrap();

    let mut blocker = SqliteConnection::connect(&url).await.unwrap();
    sqlx::query("BEGIN EXCLUSIVE").execute(&mut blocker).await.unwrap();

    let writer = {
        let ledger = ledger.clone();
        tokio::spawn(async move { ledger.post_message(addr(1), "gm".into()).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!writer.is_finished());

    let registered = tokio::time::timeout(Duration::from_millis(500), ledger.is_registered(&addr(1))).await;
    assert_eq!(registered.ok(), Some(true));
    assert!(ledger.general_messages().await.is_empty());

    sqlx::query("ROLLBACK").execute(&mut blocker).await.unwrap();
    assert_eq!(writer.await.unwrap().unwrap(), 0);
    assert_eq!(ledger.general_messages().await.len(), 1);

    blocker.close().await.unwrap();
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

#[tokio::test]
async fn messages_sent_tracks_general_posts() {
    let ledger = open(LedgerPolicy::default()).await;
    ledger.register(addr(1), "alice".into(), String::new()).await.unwrap();
    ledger.register(addr(2), "bob".into(), String::new()).await.unwrap();

    for _ in 0..3 {
        ledger.post_message(addr(1), "a".into()).await.unwrap();
    }
    ledger.post_message(addr(2), "b".into()).await.unwrap();
    ledger.post_direct_message(addr(1), addr(2), "dm".into()).await.unwrap();

    assert_eq!(ledger.profile(&addr(1)).await.unwrap().messages_sent, 3);
    assert_eq!(ledger.profile(&addr(2)).await.unwrap().messages_sent, 1);
}

#[tokio::test]
async fn direct_messages_and_read_flags() {
    let ledger = open(LedgerPolicy::default()).await;
    ledger.register(addr(1), "alice".into(), String::new()).await.unwrap();
    ledger.register(addr(2), "bob".into(), String::new()).await.unwrap();

    let err = ledger.post_direct_message(addr(1), addr(3), "hi".into()).await.unwrap_err();
    assert!(matches!(err, LedgerError::UnknownCounterpart(a) if a == addr(3)));

    ledger.post_direct_message(addr(1), addr(2), "hi".into()).await.unwrap();
    ledger.post_direct_message(addr(2), addr(1), "hey".into()).await.unwrap();
    ledger.post_direct_message(addr(1), addr(2), "sup".into()).await.unwrap();

    assert_eq!(ledger.conversation(&addr(1), &addr(2)).await, ledger.conversation(&addr(2), &addr(1)).await);
    assert_eq!(ledger.conversation_partners(&addr(1)).await, vec![addr(2)]);
    assert_eq!(ledger.conversation_partners(&addr(2)).await, vec![addr(1)]);

    assert_eq!(ledger.mark_conversation_read(addr(2), addr(1)).await.unwrap(), 2);
    assert_eq!(ledger.mark_conversation_read(addr(2), addr(1)).await.unwrap(), 0);
    let conversation = ledger.conversation(&addr(1), &addr(2)).await;
    let still_unread: Vec<&str> = conversation
        .iter()
        .filter(|m| !m.is_read)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(still_unread, vec!["hey"]);
}

#[tokio::test]
async fn policies_are_configurable() {
    let ledger = open(LedgerPolicy {
        allow_self_messages: false,
        same_name: SameNamePolicy::Reject,
    })
    .await;
    ledger.register(addr(1), "alice".into(), String::new()).await.unwrap();

    assert!(matches!(
        ledger.post_direct_message(addr(1), addr(1), "me".into()).await,
        Err(LedgerError::SelfMessage)
    ));
    assert!(matches!(
        ledger.change_username(addr(1), "alice".into()).await,
        Err(LedgerError::UsernameTaken(_))
    ));
}

#[tokio::test]
async fn reopening_restores_committed_state() {
    let db_pool = memory_pool().await;
    {
        let ledger = Ledger::open(db_pool.clone(), LedgerPolicy::default(), 8).await.unwrap();
        ledger.register(addr(1), "alice".into(), "Qm1".into()).await.unwrap();
        ledger.register(addr(2), "bob".into(), "Qm2".into()).await.unwrap();
        ledger.update_avatar(addr(2), "Qm3".into()).await.unwrap();
        ledger.change_username(addr(1), "alicia".into()).await.unwrap();
        ledger.post_message(addr(1), "hi".into()).await.unwrap();
        ledger.post_direct_message(addr(2), addr(1), "psst".into()).await.unwrap();
    }

    let ledger = Ledger::open(db_pool, LedgerPolicy::default(), 8).await.unwrap();
    assert_eq!(ledger.registered_addresses().await, vec![addr(1), addr(2)]);
    assert!(ledger.is_username_available("alice").await);
    assert_eq!(ledger.resolve_username("alicia").await, Some(addr(1)));
    assert_eq!(ledger.profile(&addr(2)).await.unwrap().avatar_ref, "Qm3");
    assert_eq!(ledger.profile(&addr(1)).await.unwrap().messages_sent, 1);
    assert_eq!(ledger.conversation(&addr(1), &addr(2)).await.len(), 1);
    assert_eq!(ledger.conversation_partners(&addr(1)).await, vec![addr(2)]);

    // ids continue where they left off
    assert_eq!(ledger.post_message(addr(2), "back".into()).await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_registrations_claim_a_name_once() {
    let ledger = Arc::new(open(LedgerPolicy::default()).await);

    let handles: Vec<_> = (1..=8u8)
        .map(|n| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.register(addr(n), "satoshi".into(), String::new()).await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(err) => assert!(matches!(err, LedgerError::UsernameTaken(_))),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(ledger.counts().await.0, 1);
}
