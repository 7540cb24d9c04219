//! Language client tests against the scripted fake server

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use sonar_lsp::{Position, SymbolKind};

use crate::common::{Script, kind, location, project, start, symbol, uri_of};

#[tokio::test]
async fn outline_references_and_hover() {
    let (_dir, root) = project(&[("a.ts", "export function greet(name: string) {}\n")]);
    let uri = uri_of(&root, "a.ts");

    let mut script = Script::default();
    script
        .symbols(&uri, vec![symbol("greet", kind::FUNCTION, 0, 0, 16)])
        .references(&uri, (0, 16), vec![location(&uri_of(&root, "b.ts"), 3, 2)])
        .hover(&uri, (0, 16), "function greet(name: string): void");
    let (mut client, log, server) = start(script, &root).await;

    client
        .open(&uri, "typescript", "export function greet(name: string) {}\n".to_string())
        .unwrap();
    assert!(client.is_open(&uri));

    let outline = client.outline(&uri).await;
    assert_eq!(outline.len(), 1);
    assert_eq!(outline[0].name, "greet");
    assert_eq!(outline[0].kind, SymbolKind::Function);

    let at = Position::new(0, 16);
    let references = client.references(&uri, at, false).await;
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].range.start.line, 3);
    assert_eq!(
        client.hover_text(&uri, at).await.as_deref(),
        Some("function greet(name: string): void")
    );

    client.close(&uri).unwrap();
    assert!(!client.is_open(&uri));
    client.stop().await;
    server.await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(
        log.notifications,
        vec!["textDocument/didOpen", "textDocument/didClose", "exit"]
    );
    assert_eq!(log.requests.last().map(String::as_str), Some("shutdown"));
}

#[tokio::test]
async fn queries_on_unopened_documents_are_empty() {
    let (_dir, root) = project(&[("a.ts", "")]);
    let uri = uri_of(&root, "a.ts");
    let mut script = Script::default();
    script.symbols(&uri, vec![symbol("f", kind::FUNCTION, 0, 0, 9)]);
    let (client, log, _server) = start(script, &root).await;

    assert!(client.outline(&uri).await.is_empty());
    assert!(log.lock().unwrap().requests.is_empty());
}

#[tokio::test]
async fn missing_capabilities_short_circuit() {
    let (_dir, root) = project(&[("a.ts", "")]);
    let uri = uri_of(&root, "a.ts");
    let script = Script {
        capabilities: json!({ "documentSymbolProvider": true }),
        ..Script::default()
    };
    let (mut client, log, _server) = start(script, &root).await;
    client.open(&uri, "typescript", String::new()).unwrap();

    let at = Position::new(0, 0);
    assert!(client.references(&uri, at, true).await.is_empty());
    assert!(client.hover_text(&uri, at).await.is_none());
    // Give the writer a moment; nothing should have been sent.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(log.lock().unwrap().requests.is_empty());
}

#[tokio::test]
async fn diagnostics_notifications_reach_handlers() {
    let (_dir, root) = project(&[("a.ts", ""), ("b.ts", "")]);
    let script = Script {
        publish_diagnostics: true,
        ..Script::default()
    };
    let (mut client, _log, _server) = start(script, &root).await;

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    client.on_notification(move |notification| {
        if notification.method == "textDocument/publishDiagnostics" {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    for name in ["a.ts", "b.ts"] {
        client
            .open(&uri_of(&root, name), "typescript", String::new())
            .unwrap();
    }
    // A round trip after both opens guarantees the notifications were read.
    let _ = client.outline(&uri_of(&root, "b.ts")).await;
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}
