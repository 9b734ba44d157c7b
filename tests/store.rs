mod common;

use common::{Gate, GatedBackend, MemoryBackend, history, ids, msg, roster};
use duochat::ChatError;
use duochat::api::models::{MessageKind, UserId};
use duochat::store::MessageStore;

fn ada_store(backend: &std::sync::Arc<MemoryBackend>) -> MessageStore {
    MessageStore::new(backend.clone(), UserId::new("a"))
}

#[tokio::test]
async fn load_keeps_only_own_messages() {
    let backend = MemoryBackend::new(roster(), history());
    let store = ada_store(&backend);

    assert_eq!(store.load_conversations().await.unwrap(), 3);
    let me = UserId::new("a");
    assert!(store.messages().iter().all(|m| m.sender_id == me || m.receiver_id == me));
    assert_eq!(ids(&store.messages()), ["1", "2", "3"]);
}

#[tokio::test]
async fn failed_load_keeps_last_known_state() {
    let backend = MemoryBackend::new(roster(), history());
    let store = ada_store(&backend);
    store.load_conversations().await.unwrap();

    backend.set_fail_reads(true);
    let err = store.load_conversations().await.unwrap_err();
    assert!(err.is_fetch());
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn send_appends_exactly_the_echo() {
    let backend = MemoryBackend::new(roster(), history());
    let store = ada_store(&backend);
    store.load_conversations().await.unwrap();
    let before = store.len();

    let sent = store
        .send(&UserId::new("b"), "hello", MessageKind::Text)
        .await
        .unwrap();

    assert_eq!(store.len(), before + 1);
    let last = store.messages().pop().unwrap();
    assert_eq!(last, sent);
    assert_eq!(last.content, "hello");
    assert_eq!(last.kind, MessageKind::Text);
    assert_eq!(last.sender_id, UserId::new("a"));
    // id comes from the backend, not the client
    assert!(last.id.as_str().starts_with("srv-"));

    let posted = backend.posted.lock().unwrap();
    assert!(posted[0].timestamp.ends_with('Z'));
}

#[tokio::test]
async fn failed_send_changes_nothing() {
    let backend = MemoryBackend::new(roster(), history());
    let store = ada_store(&backend);
    store.load_conversations().await.unwrap();
    backend.set_fail_writes(true);

    let err = store
        .send(&UserId::new("b"), "lost", MessageKind::Text)
        .await
        .unwrap_err();
    assert!(err.is_mutation());
    assert_eq!(ids(&store.messages()), ["1", "2", "3"]);
}

#[tokio::test]
async fn cannot_message_self() {
    let backend = MemoryBackend::new(roster(), Vec::new());
    let store = ada_store(&backend);
    let err = store
        .send(&UserId::new("a"), "me", MessageKind::Text)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::SelfMessage { .. }));
    assert!(backend.posted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn clear_removes_the_pair_and_nothing_else() {
    let mut messages = history();
    messages.push(msg("5", "b", "a", "again"));
    let backend = MemoryBackend::new(roster(), messages);
    let store = ada_store(&backend);
    store.load_conversations().await.unwrap();

    let (a, b) = (UserId::new("a"), UserId::new("b"));
    assert_eq!(store.clear(&b).await.unwrap(), 3);

    assert!(store.messages().iter().all(|m| !m.involves(&a, &b)));
    assert_eq!(ids(&store.messages()), ["3"]);
    // backend still has Ada-Cy and Bob-Cy
    assert_eq!(ids(&backend.stored()), ["3", "4"]);
    assert!(store.conversation(&b).is_empty());
}

#[tokio::test]
async fn partial_clear_keeps_undeleted_messages() {
    let backend = MemoryBackend::new(roster(), history());
    let store = ada_store(&backend);
    store.load_conversations().await.unwrap();
    backend.fail_delete_of("2");

    let err = store.clear(&UserId::new("b")).await.unwrap_err();
    match &err {
        ChatError::ClearIncomplete { removed, remaining, .. } => {
            assert_eq!(*removed, 1);
            assert_eq!(remaining.len(), 1);
            assert_eq!(remaining[0].as_str(), "2");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_mutation());
    // local view matches the backend: "2" survived on both sides
    assert_eq!(ids(&store.messages()), ["2", "3"]);
    assert_eq!(ids(&backend.stored()), ["2", "3", "4"]);
}

#[tokio::test]
async fn clear_treats_already_deleted_as_done() {
    let backend = MemoryBackend::new(roster(), history());
    let store = ada_store(&backend);
    store.load_conversations().await.unwrap();
    backend.remove_remote("1");

    assert_eq!(store.clear(&UserId::new("b")).await.unwrap(), 2);
    assert_eq!(ids(&store.messages()), ["3"]);
}

#[tokio::test]
async fn refresh_reports_remote_changes() {
    let backend = MemoryBackend::new(roster(), history());
    let store = ada_store(&backend);
    store.load_conversations().await.unwrap();

    backend.insert_remote(msg("9", "b", "a", "new"));
    backend.insert_remote(msg("10", "b", "c", "not for ada"));
    backend.remove_remote("3");

    let diff = store.refresh().await.unwrap().unwrap();
    assert_eq!(ids(&diff.added), ["9"]);
    assert_eq!(diff.removed.len(), 1);
    assert_eq!(diff.removed[0].as_str(), "3");
    assert_eq!(ids(&store.messages()), ["1", "2", "9"]);

    let quiet = store.refresh().await.unwrap().unwrap();
    assert!(quiet.is_empty());
}

#[tokio::test]
async fn conversation_is_in_store_order() {
    let backend = MemoryBackend::new(roster(), history());
    let store = ada_store(&backend);
    store.load_conversations().await.unwrap();
    store
        .send(&UserId::new("b"), "third", MessageKind::Text)
        .await
        .unwrap();

    let convo = store.conversation(&UserId::new("b"));
    let contents: Vec<&str> = convo.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["hi bob", "hi ada", "third"]);
}

#[tokio::test]
async fn poll_during_send_keeps_a_single_copy() {
    let backend = GatedBackend::new(MemoryBackend::new(roster(), history()), Gate::Post);
    let store = MessageStore::new(backend.clone(), UserId::new("a"));
    store.load_conversations().await.unwrap();
    backend.arm();

    let peer = UserId::new("b");
    // the backend has stored the message but the POST has not answered yet
    let (sent, polled) = tokio::join!(
        store.send(&peer, "hello", MessageKind::Text),
        async {
            backend.reached.notified().await;
            let polled = store.refresh().await;
            backend.release.notify_one();
            polled
        }
    );

    let sent = sent.unwrap();
    assert_eq!(polled.unwrap(), None);
    assert_eq!(ids(&store.messages()), ["1", "2", "3", sent.id.as_str()]);
    assert!(store.refresh().await.unwrap().unwrap().is_empty());
}

#[tokio::test]
async fn hydrate_during_send_keeps_a_single_copy() {
    let backend = GatedBackend::new(MemoryBackend::new(roster(), history()), Gate::Post);
    let store = MessageStore::new(backend.clone(), UserId::new("a"));
    store.load_conversations().await.unwrap();
    backend.arm();

    let peer = UserId::new("b");
    let (sent, ()) = tokio::join!(
        store.send(&peer, "hello", MessageKind::Text),
        async {
            backend.reached.notified().await;
            store.hydrate(backend.inner.stored());
            backend.release.notify_one();
        }
    );

    let sent = sent.unwrap();
    let copies = store.messages().iter().filter(|m| m.id == sent.id).count();
    assert_eq!(copies, 1);
}

#[tokio::test]
async fn refresh_overlapping_clear_is_discarded() {
    let backend = GatedBackend::new(MemoryBackend::new(roster(), history()), Gate::Read);
    let store = MessageStore::new(backend.clone(), UserId::new("a"));
    store.load_conversations().await.unwrap();
    backend.arm();

    // GET /chats answered with 1, 2 and 3 before the clear deleted 1 and 2
    let (polled, cleared) = tokio::join!(store.refresh(), async {
        backend.reached.notified().await;
        let cleared = store.clear(&UserId::new("b")).await;
        backend.release.notify_one();
        cleared
    });

    assert_eq!(cleared.unwrap(), 2);
    assert_eq!(polled.unwrap(), None);
    assert_eq!(ids(&store.messages()), ["3"]);
}

#[tokio::test]
async fn refresh_overlapping_send_is_discarded() {
    let backend = GatedBackend::new(MemoryBackend::new(roster(), history()), Gate::Read);
    let store = MessageStore::new(backend.clone(), UserId::new("a"));
    store.load_conversations().await.unwrap();
    backend.arm();

    let (polled, sent) = tokio::join!(store.refresh(), async {
        backend.reached.notified().await;
        let sent = store.send(&UserId::new("c"), "late", MessageKind::Text).await;
        backend.release.notify_one();
        sent
    });

    let sent = sent.unwrap();
    assert_eq!(polled.unwrap(), None);
    assert_eq!(ids(&store.messages()), ["1", "2", "3", sent.id.as_str()]);
}
