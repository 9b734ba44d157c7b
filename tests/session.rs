mod common;

use common::{MemoryBackend, history, roster};
use duochat::{ChatError, Session};

#[tokio::test]
async fn signs_in_by_phone() {
    let backend = MemoryBackend::new(roster(), history());
    let session = Session::sign_in(backend.as_ref(), " 555 0101 ").await.unwrap();
    assert_eq!(session.current().map(|u| u.name.as_str()), Some("Bob"));
}

#[tokio::test]
async fn unknown_phone_is_rejected() {
    let backend = MemoryBackend::new(roster(), history());
    let err = Session::sign_in(backend.as_ref(), "555-9999").await.unwrap_err();
    assert!(matches!(err, ChatError::UnknownUser { phone } if phone == "555-9999"));

    let err = Session::sign_in(backend.as_ref(), "").await.unwrap_err();
    assert!(matches!(err, ChatError::UnknownUser { .. }));
}

#[tokio::test]
async fn backend_down_is_a_fetch_error() {
    let backend = MemoryBackend::new(roster(), history());
    backend.set_fail_reads(true);
    let err = Session::sign_in(backend.as_ref(), "555-0101").await.unwrap_err();
    assert!(err.is_fetch());
}
