use duedeck::push::{self, PushEvent};
use futures::{SinkExt, StreamExt};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::error::{Error as WsError, UrlError};

const STEP: Duration = Duration::from_secs(5);

const NOTES_FRAME: &str = r#"42["notes_updated",{"notes":[{"id":"1","mata_kuliah":"Algorithms","status":"pending","deadline_timestamp":10}]}]"#;

fn push_url(listener: &TcpListener) -> String {
    let addr = listener.local_addr().unwrap();
    format!("ws://{}/socket.io/?EIO=4&transport=websocket", addr)
}

async fn accept_ws(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = timeout(STEP, listener.accept())
        .await
        .expect("client never connected")
        .unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn expect_text(ws: &mut WebSocketStream<TcpStream>, want: &str) {
    let msg = timeout(STEP, ws.next())
        .await
        .expect("client went quiet")
        .expect("client hung up")
        .unwrap();
    assert_eq!(msg.to_text().unwrap(), want);
}

async fn next_event(rx: &mut mpsc::Receiver<PushEvent>) -> PushEvent {
    timeout(STEP, rx.recv())
        .await
        .expect("no push event")
        .expect("listener stopped")
}

/// Engine.IO open, Socket.IO connect and one ping, as a Flask-SocketIO
/// server does it.
async fn handshake(ws: &mut WebSocketStream<TcpStream>) {
    ws.send(WsMessage::text(
        r#"0{"sid":"a","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#,
    ))
    .await
    .unwrap();
    expect_text(ws, "40").await;
    ws.send(WsMessage::text(r#"40{"sid":"b"}"#)).await.unwrap();
    ws.send(WsMessage::text("2")).await.unwrap();
    expect_text(ws, "3").await;
}

#[tokio::test]
async fn test_listener_delivers_updates_and_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (tx, mut rx) = mpsc::channel(16);
    let task = tokio::spawn(push::listen(push_url(&listener), tx));

    // First attempt dies before the websocket upgrade.
    let (stream, _) = timeout(STEP, listener.accept()).await.unwrap().unwrap();
    drop(stream);
    assert!(matches!(next_event(&mut rx).await, PushEvent::Disconnected(_)));

    let mut ws = accept_ws(&listener).await;
    handshake(&mut ws).await;
    assert_eq!(next_event(&mut rx).await, PushEvent::Connected);

    ws.send(WsMessage::text(NOTES_FRAME)).await.unwrap();
    let PushEvent::NotesUpdated(tasks) = next_event(&mut rx).await else {
        panic!("expected a notes update");
    };
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Algorithms");

    ws.close(None).await.unwrap();
    assert!(matches!(next_event(&mut rx).await, PushEvent::Disconnected(_)));
    let closed_at = Instant::now();

    // The accepted connection resets the delay to 1 s; the earlier failure
    // alone would have made it 2 s.
    let _again = accept_ws(&listener).await;
    let waited = closed_at.elapsed();
    assert!(waited >= Duration::from_millis(800), "{:?}", waited);
    assert!(waited < Duration::from_millis(1800), "{:?}", waited);

    drop(rx);
    task.abort();
}

#[tokio::test]
async fn test_unknown_events_are_skipped() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (tx, mut rx) = mpsc::channel(16);
    let task = tokio::spawn(push::listen(push_url(&listener), tx));

    let mut ws = accept_ws(&listener).await;
    handshake(&mut ws).await;
    assert_eq!(next_event(&mut rx).await, PushEvent::Connected);

    ws.send(WsMessage::text(r#"42["typing",{"user":7}]"#)).await.unwrap();
    ws.send(WsMessage::text("42{broken")).await.unwrap();
    ws.send(WsMessage::text(NOTES_FRAME)).await.unwrap();
    assert!(matches!(next_event(&mut rx).await, PushEvent::NotesUpdated(_)));

    task.abort();
}

#[tokio::test]
async fn test_secure_urls_speak_tls() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut first = [0u8; 1];
        stream.read_exact(&mut first).await.unwrap();
        first[0]
    });

    let url = format!("wss://{}/socket.io/?EIO=4&transport=websocket", addr);
    let err = tokio_tungstenite::connect_async(url).await.unwrap_err();
    assert!(!matches!(err, WsError::Url(UrlError::TlsFeatureNotEnabled)), "{:?}", err);

    // 0x16 opens a TLS handshake record (the ClientHello).
    assert_eq!(timeout(STEP, server).await.unwrap().unwrap(), 0x16);
}
