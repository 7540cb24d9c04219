//! Transport session tests against a raw peer

use std::path::Path;
use std::time::Duration;

use serde_json::{Value, json};
use sonar_lsp::{Message, Session, SessionError};

use crate::common::{fast_options, pipes};

async fn ready_session() -> (Session, crate::common::Peer) {
    let (reader, writer, mut peer) = pipes();
    let mut session = Session::connect(reader, writer, fast_options());
    let server = tokio::spawn(async move {
        peer.accept_handshake(json!({ "referencesProvider": true }))
            .await;
        peer
    });
    session
        .handshake(Path::new("/workspace"), None)
        .await
        .unwrap();
    (session, server.await.unwrap())
}

#[tokio::test]
async fn responses_out_of_order_reach_their_callers() {
    let (session, mut peer) = ready_session().await;

    let server = tokio::spawn(async move {
        let mut received = Vec::new();
        while received.len() < 4 {
            if let Some(Message::Request { id, params, .. }) = peer.next_message().await {
                received.push((id, params.unwrap_or(Value::Null)));
            }
        }
        // Answer newest first.
        for (id, params) in received.into_iter().rev() {
            peer.reply(id, json!({ "echo": params["n"] })).await;
        }
        peer
    });

    let timeout = Duration::from_secs(2);
    let (a, b, c, d) = tokio::join!(
        session.request("custom/echo", Some(json!({ "n": 0 })), timeout),
        session.request("custom/echo", Some(json!({ "n": 1 })), timeout),
        session.request("custom/echo", Some(json!({ "n": 2 })), timeout),
        session.request("custom/echo", Some(json!({ "n": 3 })), timeout),
    );
    for (n, result) in [a, b, c, d].into_iter().enumerate() {
        assert_eq!(result.unwrap()["echo"], n);
    }
    let _peer = server.await.unwrap();
}

#[tokio::test]
async fn a_timed_out_request_does_not_block_others() {
    let (session, mut peer) = ready_session().await;

    let server = tokio::spawn(async move {
        let mut slow_id = None;
        for _ in 0..2 {
            let Some(Message::Request { id, method, .. }) = peer.next_message().await else {
                panic!("expected request");
            };
            if method == "custom/slow" {
                slow_id = Some(id);
            } else {
                peer.reply(id, json!("fast")).await;
            }
        }
        (peer, slow_id)
    });

    let (slow, fast) = tokio::join!(
        session.request("custom/slow", None, Duration::from_millis(100)),
        session.request("custom/fast", None, Duration::from_secs(2)),
    );
    assert!(matches!(slow, Err(SessionError::Timeout { ref method, .. }) if method == "custom/slow"));
    assert_eq!(fast.unwrap(), "fast");

    // The late answer is dropped; the session keeps working.
    let (mut peer, slow_id) = server.await.unwrap();
    peer.reply(slow_id.unwrap(), json!("late")).await;
    let server = tokio::spawn(async move {
        let Some(Message::Request { id, .. }) = peer.next_message().await else {
            panic!("expected request");
        };
        peer.reply(id, json!("again")).await;
        peer
    });
    let again = session
        .request("custom/fast", None, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(again, "again");
    let _peer = server.await.unwrap();
}

#[tokio::test]
async fn server_exit_fails_outstanding_and_later_requests() {
    let (session, mut peer) = ready_session().await;

    let server = tokio::spawn(async move {
        // Read both requests, then hang up without answering.
        for _ in 0..2 {
            let _ = peer.next_message().await;
        }
        drop(peer);
    });

    let timeout = Duration::from_secs(5);
    let (a, b) = tokio::join!(
        session.request("custom/one", None, timeout),
        session.request("custom/two", None, timeout),
    );
    server.await.unwrap();

    assert!(matches!(a, Err(SessionError::ProcessExited)));
    assert!(matches!(b, Err(SessionError::ProcessExited)));
    assert!(session.has_exited());
    assert!(matches!(
        session.request("custom/three", None, timeout).await,
        Err(SessionError::ProcessExited)
    ));
}

#[tokio::test]
async fn capabilities_come_from_initialize_result() {
    let (session, _peer) = ready_session().await;
    let caps = session.capabilities();
    assert!(caps.references);
    assert!(!caps.document_symbol);
    assert!(!caps.hover);
    assert!(session.is_ready());
}
