//! Startet den kompletten Server auf freien Ports und faehrt ihn wieder herunter

use futures_util::{SinkExt, StreamExt};
use sprechfunk_core::types::UserId;
use sprechfunk_protocol::control::{ControlMessage, ControlPayload, LoginRequest};
use sprechfunk_protocol::wire::FrameCodec;
use sprechfunk_server::{config::ServerConfig, Server};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::Framed;

fn test_config(dir: &std::path::Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.netzwerk.bind_adresse = "127.0.0.1".into();
    config.netzwerk.tcp_port = 0;
    config.netzwerk.http_port = 0;
    config.speicher.verzeichnis = dir.join("audio").to_string_lossy().into_owned();
    config
}

#[tokio::test]
async fn hochfahren_bedienen_herunterfahren() {
    let dir = tempfile::tempdir().unwrap();
    let server = Server::neu(test_config(dir.path()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let laufend = server.hochfahren(shutdown_rx).await.unwrap();
    assert!(dir.path().join("audio").is_dir());

    // Control-Protokoll
    let stream = TcpStream::connect(laufend.tcp_adresse).await.unwrap();
    let mut framed = Framed::new(stream, FrameCodec::new());
    framed
        .send(ControlMessage::new(
            1,
            ControlPayload::Login(LoginRequest {
                user_id: UserId::neu("a").unwrap(),
                token: None,
                client_version: None,
            }),
        ))
        .await
        .unwrap();
    let antwort = tokio::time::timeout(Duration::from_secs(2), framed.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(antwort.request_id, 1);
    assert!(matches!(antwort.payload, ControlPayload::LoginResponse(_)));

    // HTTP Health-Check ueber rohes HTTP/1.1
    let mut http = TcpStream::connect(laufend.http_adresse).await.unwrap();
    http.write_all(b"GET /health HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut antwort = String::new();
    tokio::time::timeout(Duration::from_secs(2), http.read_to_string(&mut antwort))
        .await
        .unwrap()
        .unwrap();
    assert!(antwort.starts_with("HTTP/1.1 200"), "{antwort}");
    assert!(antwort.contains("\"status\":\"ok\""));

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), laufend.beenden())
        .await
        .expect("Subsysteme beenden sich nach dem Shutdown-Signal");
}
