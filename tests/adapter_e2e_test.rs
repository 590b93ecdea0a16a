use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_test::assert_ok;

use chat_tetris::adapter::{run_server, ServerConfig};
use chat_tetris::session::{SessionId, SessionRegistry};

const HELLO: &str = r#"{"type":"hello","seq":1,"ts":1,"client":{"name":"e2e-test","version":"0.1.0"},"protocol_version":"1.0.0"}"#;

async fn start_server() -> (SocketAddr, SessionRegistry, tokio::task::JoinHandle<()>) {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..ServerConfig::default()
    };
    let registry = SessionRegistry::with_config(config.session_config());
    let (ready_tx, ready_rx) = oneshot::channel();

    let server_registry = registry.clone();
    let handle = tokio::spawn(async move {
        let _ = run_server(config, server_registry, Some(ready_tx)).await;
    });

    let addr = tokio::time::timeout(Duration::from_secs(2), ready_rx)
        .await
        .expect("server did not signal ready")
        .expect("ready channel dropped");
    (addr, registry, handle)
}

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect failed");
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        assert_ok!(self.writer.write_all(line.as_bytes()).await);
        assert_ok!(self.writer.write_all(b"\n").await);
        assert_ok!(self.writer.flush().await);
    }

    async fn recv(&mut self) -> Option<Value> {
        let line = tokio::time::timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("timed out waiting for server")
            .expect("read failed")?;
        Some(serde_json::from_str(&line).expect("server sent invalid JSON"))
    }

    /// Next message of the given type; gravity observations in between are skipped
    async fn recv_type(&mut self, msg_type: &str) -> Value {
        loop {
            let msg = self.recv().await.expect("connection closed");
            if msg["type"] == msg_type {
                return msg;
            }
            assert_eq!(msg["type"], "observation", "unexpected message {}", msg);
        }
    }

    async fn handshake(&mut self) {
        self.send(HELLO).await;
        let welcome = self.recv_type("welcome").await;
        assert_eq!(welcome["seq"], 1);
        assert_eq!(welcome["protocol_version"], "1.0.0");
    }
}

#[tokio::test]
async fn full_game_flow_over_socket() {
    let (addr, _registry, server) = start_server().await;
    let mut client = TestClient::connect(addr).await;
    client.handshake().await;

    // Seed 5 deals an O first.
    client
        .send(r#"{"type":"start","seq":2,"ts":2,"user":42,"seed":5}"#)
        .await;
    let ack = client.recv_type("ack").await;
    assert_eq!(ack["seq"], 2);
    let obs = client.recv_type("observation").await;
    assert_eq!(obs["user"], 42);
    assert_eq!(obs["active"]["kind"], "o");
    assert_eq!(obs["board"]["cells"].as_array().unwrap().len(), 20);
    assert_eq!(obs["fall_interval_ms"], 1000);

    client
        .send(r#"{"type":"command","seq":3,"ts":3,"user":42,"actions":["hardDrop"]}"#)
        .await;
    // The ack and the drop's observation travel separately; accept either order.
    let mut dropped = None;
    let mut acked = false;
    while dropped.is_none() || !acked {
        let msg = client.recv().await.expect("connection closed");
        if msg["type"] == "ack" {
            assert_eq!(msg["seq"], 3);
            acked = true;
        } else if msg["type"] == "observation" && msg["pieces_placed"] == 1 && dropped.is_none() {
            dropped = Some(msg);
        }
    }
    let dropped = dropped.unwrap();
    assert_eq!(dropped["score"], 36);
    assert_eq!(dropped["board"]["cells"][19][4], 2);

    client.send(r#"{"type":"end","seq":4,"ts":4,"user":42}"#).await;
    let ack = client.recv_type("ack").await;
    assert_eq!(ack["seq"], 4);
    let over = client.recv_type("game_over").await;
    assert_eq!(over["user"], 42);
    assert_eq!(over["reason"], "ended");
    assert_eq!(over["score"], 36);

    client.send(r#"{"type":"stats","seq":5,"ts":5,"user":42}"#).await;
    let stats = client.recv_type("stats").await;
    assert_eq!(stats["seq"], 5);
    assert_eq!(stats["games_played"], 1);
    assert_eq!(stats["best_score"], 36);

    server.abort();
}

#[tokio::test]
async fn commands_before_hello_are_rejected() {
    let (addr, _registry, server) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    client
        .send(r#"{"type":"start","seq":1,"ts":1,"user":1}"#)
        .await;
    let err = client.recv_type("error").await;
    assert_eq!(err["code"], "handshake_required");
    assert_eq!(err["seq"], 1);

    server.abort();
}

#[tokio::test]
async fn unknown_type_before_hello_needs_handshake() {
    let (addr, _registry, server) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    client.send(r#"{"type":"control","seq":1,"ts":1}"#).await;
    let err = client.recv_type("error").await;
    assert_eq!(err["code"], "handshake_required");
    assert_eq!(err["seq"], 1);

    server.abort();
}

#[tokio::test]
async fn full_action_list_is_applied_as_one_command() {
    let (addr, _registry, server) = start_server().await;
    let mut client = TestClient::connect(addr).await;
    client.handshake().await;

    client
        .send(r#"{"type":"start","seq":2,"ts":2,"user":77,"seed":3}"#)
        .await;
    client.recv_type("ack").await;

    // Twelve pause/resume pairs, then enough lefts to reach the wall
    let mut actions = vec!["\"pause\"", "\"resume\""].repeat(12);
    actions.extend(["\"moveLeft\""; 8]);
    assert_eq!(actions.len(), 32);
    let line = format!(
        r#"{{"type":"command","seq":3,"ts":3,"user":77,"actions":[{}]}}"#,
        actions.join(",")
    );
    client.send(&line).await;

    let mut acked = false;
    let mut at_wall = false;
    while !acked || !at_wall {
        let msg = client.recv().await.expect("connection closed");
        match msg["type"].as_str() {
            Some("ack") => {
                assert_eq!(msg["seq"], 3);
                acked = true;
            }
            Some("observation") => {
                assert_eq!(msg["paused"], false);
                if msg["active"]["x"] == 0 {
                    at_wall = true;
                }
            }
            _ => panic!("unexpected message {}", msg),
        }
    }

    server.abort();
}

#[tokio::test]
async fn protocol_mismatch_closes_connection() {
    let (addr, _registry, server) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    client
        .send(r#"{"type":"hello","seq":1,"ts":1,"client":{"name":"old","version":"0"},"protocol_version":"2.0.0"}"#)
        .await;
    let err = client.recv_type("error").await;
    assert_eq!(err["code"], "protocol_mismatch");
    assert!(client.recv().await.is_none());

    server.abort();
}

#[tokio::test]
async fn session_errors_are_reported() {
    let (addr, _registry, server) = start_server().await;
    let mut client = TestClient::connect(addr).await;
    client.handshake().await;

    client
        .send(r#"{"type":"start","seq":2,"ts":2,"user":7,"seed":3}"#)
        .await;
    client.recv_type("ack").await;

    client
        .send(r#"{"type":"start","seq":3,"ts":3,"user":7}"#)
        .await;
    assert_eq!(client.recv_type("error").await["code"], "session_exists");

    client
        .send(r#"{"type":"command","seq":4,"ts":4,"user":8,"actions":["moveLeft"]}"#)
        .await;
    assert_eq!(client.recv_type("error").await["code"], "no_session");

    client
        .send(r#"{"type":"command","seq":4,"ts":5,"user":7,"actions":["moveLeft"]}"#)
        .await;
    assert_eq!(client.recv_type("error").await["code"], "invalid_command");

    client
        .send(r#"{"type":"command","seq":5,"ts":6,"user":7,"actions":["hold"]}"#)
        .await;
    let err = client.recv_type("error").await;
    assert_eq!(err["code"], "invalid_command");
    assert_eq!(err["seq"], 5);

    client.send(r#"{"type":"control","seq":6,"ts":7}"#).await;
    assert_eq!(client.recv_type("error").await["code"], "invalid_command");

    server.abort();
}

#[tokio::test]
async fn disconnect_ends_owned_games() {
    let (addr, registry, server) = start_server().await;
    let mut client = TestClient::connect(addr).await;
    client.handshake().await;

    client
        .send(r#"{"type":"start","seq":2,"ts":2,"user":99,"seed":1}"#)
        .await;
    client.recv_type("ack").await;
    assert!(registry.contains(SessionId(99)).await);

    drop(client);

    let ended = tokio::time::timeout(Duration::from_secs(2), async {
        while registry.contains(SessionId(99)).await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(ended.is_ok(), "game outlived its connection");
    assert_eq!(registry.stats(SessionId(99)).await.games_played, 1);

    server.abort();
}
